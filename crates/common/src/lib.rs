pub mod oracle;
pub mod url_quirks;
pub mod validation;
pub mod webcams;

