use serde::{Deserialize, Serialize};

/// A named MAC address read from one spreadsheet row.
#[derive(Debug)]
#[cfg_attr(test, derive(PartialEq))]
pub struct MacEntry {
    pub(crate) name: String,
    pub(crate) mac: String,
}

#[derive(Serialize, Deserialize, Debug)]
#[cfg_attr(test, derive(PartialEq))]
pub struct AddressGroup {
    pub(crate) name: String,
    pub(crate) members: Vec<String>,
}
