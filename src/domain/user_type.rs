#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserType {
    Free,
    Paid,
    Admin,
}

impl UserType {
    pub fn parse(s: &str) -> Result<Self, String> {
        match s {
            "free_user" => Ok(Self::Free),
            "paid_user" => Ok(Self::Paid),
            "admin" => Ok(Self::Admin),
            other => Err(format!("{other} is not a valid user type.")),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free_user",
            Self::Paid => "paid_user",
            Self::Admin => "admin",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }

    pub fn has_paid_access(&self) -> bool {
        matches!(self, Self::Paid | Self::Admin)
    }
}

impl std::fmt::Display for UserType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for UserType {
    type Error = String;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        UserType::parse(&value)
    }
}
