#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessTier {
    Free,
    Paid,
}

impl AccessTier {
    pub fn parse(s: &str) -> Result<Self, String> {
        match s {
            "free" => Ok(Self::Free),
            "paid" => Ok(Self::Paid),
            other => Err(format!("{other} is not a valid access tier.")),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Paid => "paid",
        }
    }
}

impl std::fmt::Display for AccessTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for AccessTier {
    type Error = String;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        AccessTier::parse(&value)
    }
}

impl<'de> serde::Deserialize<'de> for AccessTier {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        AccessTier::parse(&s).map_err(serde::de::Error::custom)
    }
}
