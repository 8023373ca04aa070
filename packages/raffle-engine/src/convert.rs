use tracing::warn;

/// Result of asking the converter for a display form of an identifier.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Conversion {
    Converted(String),
    Unavailable { reason: String },
}

/// External identifier → display-address transform (e.g. raw UTXO address → bech32).
pub trait AddressConverter {
    fn convert(&self, raw: &str) -> Conversion;
}

impl<F> AddressConverter for F
where
    F: Fn(&str) -> Conversion,
{
    fn convert(&self, raw: &str) -> Conversion {
        self(raw)
    }
}

/// Display names for winners. Stops calling the converter after it first reports itself
/// unavailable and falls back to raw identifiers from then on.
pub struct DisplayNames<'c> {
    converter: Option<&'c dyn AddressConverter>,
    unavailable: bool,
}

impl<'c> DisplayNames<'c> {
    pub fn new(converter: Option<&'c dyn AddressConverter>) -> Self {
        Self {
            converter,
            unavailable: false,
        }
    }

    pub fn resolve(&mut self, participant: &str) -> String {
        let Some(converter) = self.converter.filter(|_| !self.unavailable) else {
            return participant.to_string();
        };
        match converter.convert(participant) {
            Conversion::Converted(display) if !display.is_empty() => display,
            Conversion::Converted(_) => participant.to_string(),
            Conversion::Unavailable { reason } => {
                warn!(%reason, "address converter unavailable, showing raw identifiers");
                self.unavailable = true;
                participant.to_string()
            }
        }
    }

    /// True once the converter has failed during this run.
    pub fn converter_failed(&self) -> bool {
        self.unavailable
    }
}
