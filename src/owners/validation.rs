//! Input normalization and field rules for owner accounts.

use regex::Regex;

use crate::store::Vehicle;

const MIN_NIC_LEN: usize = 9;
const MIN_PASSWORD_LEN: usize = 8;
const MIN_VEHICLE_YEAR: i32 = 1900;
const MAX_VEHICLE_YEAR: i32 = 2100;

/// NICs are compared trimmed and upper-cased everywhere.
#[must_use]
pub fn normalize_nic(nic: &str) -> String {
    nic.trim().to_uppercase()
}

/// Emails are compared trimmed and lower-cased everywhere.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[must_use]
pub fn valid_nic(nic_normalized: &str) -> bool {
    nic_normalized.chars().count() >= MIN_NIC_LEN
        && nic_normalized.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Basic email format check on already-normalized input.
#[must_use]
pub fn valid_email(email_normalized: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email_normalized))
}

#[must_use]
pub fn valid_phone(phone: &str) -> bool {
    Regex::new(r"^\+?[0-9][0-9 \-]{6,18}[0-9]$").is_ok_and(|regex| regex.is_match(phone.trim()))
}

/// `None` when the password satisfies the policy, otherwise a single message
/// naming every missing requirement.
#[must_use]
pub fn password_policy_violation(password: &str) -> Option<String> {
    if password.trim().is_empty() {
        return Some("Password cannot be empty.".to_string());
    }

    let mut missing = Vec::new();
    if password.chars().count() < MIN_PASSWORD_LEN {
        missing.push("at least 8 characters");
    }
    if !password.chars().any(char::is_uppercase) {
        missing.push("one uppercase letter");
    }
    if !password.chars().any(char::is_lowercase) {
        missing.push("one lowercase letter");
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        missing.push("one digit");
    }
    if !password.chars().any(|c| !c.is_alphanumeric()) {
        missing.push("one special character");
    }

    if missing.is_empty() {
        None
    } else {
        Some(format!("Password must contain {}.", missing.join(", ")))
    }
}

pub(crate) fn check_required(errors: &mut Vec<String>, field: &str, value: &str) {
    if value.trim().is_empty() {
        errors.push(format!("{field} is required"));
    }
}

pub(crate) fn check_vehicles(errors: &mut Vec<String>, vehicles: &[Vehicle]) {
    for (index, vehicle) in vehicles.iter().enumerate() {
        let position = index + 1;
        if vehicle.make.trim().is_empty() || vehicle.model.trim().is_empty() {
            errors.push(format!("Vehicle {position}: make and model are required"));
        }
        if vehicle.license_plate.trim().is_empty() {
            errors.push(format!("Vehicle {position}: license plate is required"));
        }
        if !(MIN_VEHICLE_YEAR..=MAX_VEHICLE_YEAR).contains(&vehicle.year) {
            errors.push(format!("Vehicle {position}: year is out of range"));
        }
    }
}
