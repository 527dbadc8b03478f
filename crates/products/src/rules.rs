//! Field rules shared by creation, patching and rehydration.
//!
//! Every check appends to a [`ValidationErrors`] report instead of returning
//! early, so one pass reports all bad fields.

use catalog_core::ValidationErrors;

pub const NAME_MAX_CHARS: usize = 200;
pub const DESCRIPTION_MAX_CHARS: usize = 1000;
pub const CATEGORY_MAX_CHARS: usize = 100;

pub(crate) fn check_name(value: &str, errors: &mut ValidationErrors) {
    check_required_text("name", value, NAME_MAX_CHARS, errors);
}

pub(crate) fn check_category(value: &str, errors: &mut ValidationErrors) {
    check_required_text("category", value, CATEGORY_MAX_CHARS, errors);
}

/// Description on create and on stored records: optional, only bounded in length.
pub(crate) fn check_description(value: Option<&str>, errors: &mut ValidationErrors) {
    if let Some(value) = value {
        check_max_chars("description", value, DESCRIPTION_MAX_CHARS, errors);
    }
}

/// Description in a patch: a present value must also carry text.
pub(crate) fn check_patch_description(value: Option<&str>, errors: &mut ValidationErrors) {
    if let Some(value) = value {
        check_required_text("description", value, DESCRIPTION_MAX_CHARS, errors);
    }
}

pub(crate) fn check_price(value: f64, errors: &mut ValidationErrors) {
    if !value.is_finite() {
        errors.push("price", "must be a finite number");
    } else if value <= 0.0 {
        errors.push("price", "must be greater than 0");
    }
}

pub(crate) fn check_stock(value: i64, errors: &mut ValidationErrors) {
    if value < 0 {
        errors.push("stock", "must be at least 0");
    }
}

// Length is counted in characters, not bytes.
fn check_required_text(field: &str, value: &str, max: usize, errors: &mut ValidationErrors) {
    if value.trim().is_empty() {
        errors.push(field, "must not be empty or whitespace only");
        return;
    }
    check_max_chars(field, value, max, errors);
}

fn check_max_chars(field: &str, value: &str, max: usize, errors: &mut ValidationErrors) {
    let len = value.chars().count();
    if len > max {
        errors.push(field, format!("must be at most {max} characters (got {len})"));
    }
}
