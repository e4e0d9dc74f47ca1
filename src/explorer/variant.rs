use serde::{Deserialize, Serialize};

/// Which operating-system track of the walkthrough is shown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// Windows target machine.
    Windows,
    /// Linux target machine.
    #[default]
    Linux,
}

impl Variant {
    /// Every variant, in display order
    pub const ALL: [Variant; 2] = [Variant::Windows, Variant::Linux];
}

impl std::fmt::Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Variant::Windows => write!(f, "windows"),
            Variant::Linux => write!(f, "linux"),
        }
    }
}

impl std::str::FromStr for Variant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "windows" => Ok(Variant::Windows),
            "linux" => Ok(Variant::Linux),
            _ => Err(format!("Unknown variant: {}", s)),
        }
    }
}

/// One value per variant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PerVariant<T> {
    /// Windows value.
    pub windows: T,
    /// Linux value.
    pub linux: T,
}

impl<T> PerVariant<T> {
    /// Build from both values
    pub fn new(windows: T, linux: T) -> Self {
        Self { windows, linux }
    }

    /// Value for `variant`
    pub fn get(&self, variant: Variant) -> &T {
        match variant {
            Variant::Windows => &self.windows,
            Variant::Linux => &self.linux,
        }
    }

    /// Mutable value for `variant`
    pub fn get_mut(&mut self, variant: Variant) -> &mut T {
        match variant {
            Variant::Windows => &mut self.windows,
            Variant::Linux => &mut self.linux,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_parse() {
        for variant in Variant::ALL {
            assert_eq!(variant.to_string().parse::<Variant>(), Ok(variant));
        }
        assert_eq!(" Windows ".parse::<Variant>(), Ok(Variant::Windows));
        assert!("macos".parse::<Variant>().is_err());
    }

    #[test]
    fn test_default_is_linux() {
        assert_eq!(Variant::default(), Variant::Linux);
    }

    #[test]
    fn test_serde_lowercase() {
        assert_eq!(serde_json::to_string(&Variant::Windows).unwrap(), "\"windows\"");
        let v: Variant = serde_json::from_str("\"linux\"").unwrap();
        assert_eq!(v, Variant::Linux);
    }

    #[test]
    fn test_per_variant_access() {
        let mut values = PerVariant::new(1, 2);
        assert_eq!(*values.get(Variant::Windows), 1);
        *values.get_mut(Variant::Linux) += 5;
        assert_eq!(values.linux, 7);
    }
}
