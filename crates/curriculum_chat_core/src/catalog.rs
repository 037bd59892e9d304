//! crates/curriculum_chat_core/src/catalog.rs
//!
//! The built-in course catalog served by the student portal.

use crate::domain::Course;

/// Returns the fixed course catalog. Defined once, immutable for the
/// lifetime of the process.
pub fn builtin() -> Vec<Course> {
    [
        ("acc-en", "محاسبة إنجليزي", "Accounting in English", "🔤"),
        ("mkt", "مبادئ التسويق", "Principles of Marketing", "📢"),
        ("corp-acc", "محاسبة شركات", "Corporate Accounting", "🏢"),
        ("op-res", "بحوث العمليات", "Operations Research", "📊"),
        ("corp-law", "قانون الشركات", "Corporate Law", "⚖️"),
        ("risk-ins", "خطر وتأمين", "Risk and Insurance", "🛡️"),
    ]
    .into_iter()
    .map(|(id, name, english_name, icon)| Course {
        id: id.to_string(),
        name: name.to_string(),
        english_name: english_name.to_string(),
        icon: icon.to_string(),
    })
    .collect()
}
