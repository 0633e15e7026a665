pub struct AddressSchema {
    pub street: String,
    pub city: String,
    #[serde(rename = "postalCode")]
    pub postal_code: Option<String>,
}
