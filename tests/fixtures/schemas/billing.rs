/// Invoice address
pub struct AddressSchema {
    pub holder: String,
    /// International bank account number
    pub iban: String,
}
