//! Preset analysis prompts offered as one-click questions.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// A parenthesised ticker such as `(AAPL)` or `(005930.KS)`
static TICKER_IN_PARENS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\(([A-Z0-9]{1,6}(?:[.\-][A-Z]{1,3})?)\)")
        .expect("Failed to compile TICKER_IN_PARENS")
});

#[derive(Clone, Copy, Debug, Serialize)]
pub struct Preset {
    pub label: &'static str,
    pub prompt: &'static str,
}

impl Preset {
    /// Ticker named in the label or prompt, if any.
    ///
    /// Parenthesised lists like `(AI, robotics)` are not tickers.
    pub fn ticker_hint(&self) -> Option<&'static str> {
        [self.label, self.prompt].into_iter().find_map(|text| {
            TICKER_IN_PARENS
                .captures(text)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str())
        })
    }
}

pub const PRESETS: [Preset; 7] = [
    Preset {
        label: "Optimal asset allocation",
        prompt: "Considering my risk profile and current market conditions, recommend the optimal \
                 allocation across asset classes such as stocks, bonds, cash, commodities and real \
                 estate, and explain the pros, cons and strategy for each asset class.",
    },
    Preset {
        label: "Growth stock portfolio",
        prompt: "Recommend 5-7 promising growth stocks tied to innovative technologies (AI, \
                 robotics, clean energy, space) expected to grow strongly over the next 5 years, \
                 and analyse each company's competitive advantage and growth outlook.",
    },
    Preset {
        label: "Dividend strategy",
        prompt: "Recommend a portfolio of high-quality dividend stocks that provide stable income, \
                 analysed in terms of dividend growth and sustainability. Also explain the pros and \
                 cons of dividend investing.",
    },
    Preset {
        label: "Defensive portfolio",
        prompt: "Build a defensive portfolio that stays relatively stable during recessions or \
                 market downturns, centred on low volatility, high dividend and value stocks, and \
                 explain the risk management strategy.",
    },
    Preset {
        label: "Global diversification",
        prompt: "Recommend a global ETF portfolio balanced across regions and countries, explain \
                 the economic outlook and attractiveness of each region, and include how to manage \
                 currency risk.",
    },
    Preset {
        label: "Samsung Electronics deep dive",
        prompt: "Analyse Samsung Electronics (005930.KS): current valuation, semiconductor market \
                 outlook, strengths versus competitors and growth drivers for the next 5 years, and \
                 assess its suitability as an investment.",
    },
    Preset {
        label: "Apple company analysis",
        prompt: "Analyse Apple (AAPL) in depth: recent earnings, growth drivers, competitive \
                 landscape and valuation, and assess its suitability as a long-term investment.",
    },
];

pub fn preset(index: usize) -> Option<&'static Preset> {
    PRESETS.get(index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticker_hints() {
        let hints: Vec<_> = PRESETS.iter().map(Preset::ticker_hint).collect();
        assert_eq!(
            hints,
            [None, None, None, None, None, Some("005930.KS"), Some("AAPL")]
        );
    }

    #[test]
    fn test_label_hint_wins_over_prompt() {
        let preset = Preset {
            label: "Tesla (TSLA)",
            prompt: "Compare with (NVDA)",
        };
        assert_eq!(preset.ticker_hint(), Some("TSLA"));
    }

    #[test]
    fn test_preset_lookup() {
        assert!(preset(0).is_some());
        assert!(preset(PRESETS.len()).is_none());
    }
}
