use std::fmt;
use std::str::FromStr;

/// How the next pointer click on the chart is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InteractionMode {
    #[default]
    None,
    Trend,
    Buy,
    Sell,
}

impl InteractionMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Trend => "trend",
            Self::Buy => "buy",
            Self::Sell => "sell",
        }
    }
}

impl fmt::Display for InteractionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InteractionMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "" | "none" => Ok(Self::None),
            "trend" => Ok(Self::Trend),
            "buy" => Ok(Self::Buy),
            "sell" => Ok(Self::Sell),
            other => Err(format!("unsupported interaction mode: {other}")),
        }
    }
}
