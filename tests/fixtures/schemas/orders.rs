use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct OrderLine {
    pub sku: String,
    pub quantity: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OrderSchema {
    pub id: u64,
    pub lines: Vec<OrderLine>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(skip)]
    pub internal_ref: String,
}
