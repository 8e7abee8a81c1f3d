//! Hint preferences
//!
//! Each flag controls whether one category of transaction data is shared with
//! searchers. `None` leaves the category to the service default.

use serde::{ser::SerializeSeq, Serialize, Serializer};

/// Wire name of the hint that is always shared alongside explicit hints
pub const HASH_HINT: &str = "hash";

/// Data categories a submitter allows the matchmaker to disclose
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HintPreferences {
    pub calldata: Option<bool>,
    pub contract_address: Option<bool>,
    pub function_selector: Option<bool>,
    pub logs: Option<bool>,
    pub tx_hash: Option<bool>,
}

impl HintPreferences {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calldata(mut self, share: bool) -> Self {
        self.calldata = Some(share);
        self
    }

    pub fn contract_address(mut self, share: bool) -> Self {
        self.contract_address = Some(share);
        self
    }

    pub fn function_selector(mut self, share: bool) -> Self {
        self.function_selector = Some(share);
        self
    }

    pub fn logs(mut self, share: bool) -> Self {
        self.logs = Some(share);
        self
    }

    pub fn tx_hash(mut self, share: bool) -> Self {
        self.tx_hash = Some(share);
        self
    }

    /// True when no flag was set, so the service default applies
    pub fn is_unspecified(&self) -> bool {
        self.flags().iter().all(|(_, flag)| flag.is_none())
    }

    fn flags(&self) -> [(&'static str, Option<bool>); 5] {
        [
            ("calldata", self.calldata),
            ("contract_address", self.contract_address),
            ("function_selector", self.function_selector),
            ("logs", self.logs),
            ("tx_hash", self.tx_hash),
        ]
    }

    /// Hint names sent on the wire: every enabled flag, then `hash`
    pub fn to_wire_names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self
            .flags()
            .into_iter()
            .filter(|(_, flag)| *flag == Some(true))
            .map(|(name, _)| name)
            .collect();
        names.push(HASH_HINT);
        names
    }

    /// Rebuild preferences from wire hint names.
    ///
    /// Listed hints become `Some(true)`, unlisted ones `Some(false)`: a wire list
    /// is always explicit. Returns the first unknown name on failure.
    pub fn from_wire_names<'a, I>(names: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut prefs = HintPreferences {
            calldata: Some(false),
            contract_address: Some(false),
            function_selector: Some(false),
            logs: Some(false),
            tx_hash: Some(false),
        };

        for name in names {
            match name {
                "calldata" => prefs.calldata = Some(true),
                "contract_address" => prefs.contract_address = Some(true),
                "function_selector" => prefs.function_selector = Some(true),
                "logs" => prefs.logs = Some(true),
                "tx_hash" => prefs.tx_hash = Some(true),
                HASH_HINT => {}
                other => return Err(other.to_string()),
            }
        }

        Ok(prefs)
    }
}

impl Serialize for HintPreferences {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let names = self.to_wire_names();
        let mut seq = serializer.serialize_seq(Some(names.len()))?;
        for name in names {
            seq.serialize_element(name)?;
        }
        seq.end()
    }
}
