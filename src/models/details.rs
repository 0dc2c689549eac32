use chrono::{DateTime, Utc};
use lettre::Address;
use serde::{Deserialize, Serialize};

use crate::errors::FieldError;
use crate::models::{AcType, Customer, NewAppointment, ServiceKind};

pub const MAX_UNITS_PER_SLOT: i64 = 2;

/// Customer-details form as submitted, before validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BookingDetails {
    pub name: String,
    pub address1: String,
    pub address2: Option<String>,
    pub email: String,
    pub contact: String,
    pub ac_type: Option<AcType>,
    pub service: Option<ServiceKind>,
    pub quantity: Option<i64>,
    /// Inventory item the customer is booking an installation for.
    pub ac_unit: Option<i64>,
}

impl BookingDetails {
    /// Checks every field and collects all problems at once so the form can
    /// highlight them together.
    pub fn validate(&self, scheduled_at: DateTime<Utc>) -> Result<NewAppointment, Vec<FieldError>> {
        let mut errors = Vec::new();

        let name = self.name.trim();
        if name.is_empty() {
            errors.push(FieldError::new("name", "Name is required"));
        }

        let address1 = self.address1.trim();
        if address1.is_empty() {
            errors.push(FieldError::new("address1", "Address is required"));
        }

        let email = self.email.trim();
        if email.is_empty() {
            errors.push(FieldError::new("email", "Email is required"));
        } else if !is_valid_email(email) {
            errors.push(FieldError::new("email", "Email must be a valid email"));
        }

        let contact: String = self.contact.chars().filter(|c| !c.is_whitespace()).collect();
        if contact.is_empty() {
            errors.push(FieldError::new("contact", "Contact is required"));
        } else if !is_valid_contact_number(&contact) {
            errors.push(FieldError::new("contact", "Invalid number!"));
        }

        let quantity = match self.quantity {
            None => {
                errors.push(FieldError::new("quantity", "Quantity is required"));
                0
            }
            Some(q) if q < 1 => {
                errors.push(FieldError::new("quantity", "Quantity must be at least 1"));
                0
            }
            Some(q) if q > MAX_UNITS_PER_SLOT => {
                errors.push(FieldError::new(
                    "quantity",
                    "Maximum of 2 units per time slot only!",
                ));
                0
            }
            Some(q) => q as u8,
        };

        let service = match (self.ac_unit, self.service) {
            (Some(_), None | Some(ServiceKind::Installation)) => Some(ServiceKind::Installation),
            (Some(_), Some(_)) => {
                errors.push(FieldError::new(
                    "service",
                    "Only installation can be booked for a specific unit",
                ));
                None
            }
            (None, Some(service)) => Some(service),
            (None, None) => {
                errors.push(FieldError::new("service", "Service is required!"));
                None
            }
        };

        let ac_type = match (self.ac_unit, self.ac_type) {
            (Some(_), ac_type) => ac_type.unwrap_or(AcType::Unspecified),
            (None, Some(ac_type)) if ac_type != AcType::Unspecified => ac_type,
            (None, _) => {
                errors.push(FieldError::new("ac_type", "AC Type is required"));
                AcType::Unspecified
            }
        };

        if !errors.is_empty() {
            return Err(errors);
        }

        let address = match self.address2.as_deref().map(str::trim) {
            Some(line2) if !line2.is_empty() => format!("{address1} {line2}"),
            _ => address1.to_string(),
        };

        Ok(NewAppointment {
            customer: Customer {
                name: name.to_string(),
                email: email.to_string(),
                contact_no: contact,
            },
            address,
            ac_type,
            ac_unit: self.ac_unit,
            // Both are set whenever `errors` is empty.
            service: service.unwrap_or(ServiceKind::Installation),
            quantity,
            scheduled_at,
        })
    }
}

/// Ten-digit local number, e.g. `9171234567`.
pub fn is_valid_contact_number(contact: &str) -> bool {
    contact.len() == 10 && contact.chars().all(|c| c.is_ascii_digit())
}

/// An address the SMTP transport will accept, with a dotted domain.
pub fn is_valid_email(email: &str) -> bool {
    let Ok(address) = email.parse::<Address>() else {
        return false;
    };
    let labels: Vec<&str> = address.domain().split('.').collect();
    labels.len() >= 2 && labels.iter().all(|l| !l.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 16, 1, 0, 0).unwrap()
    }

    fn valid() -> BookingDetails {
        BookingDetails {
            name: "Juan Dela Cruz".to_string(),
            address1: "12 Mabini St.".to_string(),
            address2: Some("Brgy. San Roque".to_string()),
            email: "juan@example.com".to_string(),
            contact: "917 123 4567".to_string(),
            ac_type: Some(AcType::Split),
            service: Some(ServiceKind::Cleaning),
            quantity: Some(1),
            ac_unit: None,
        }
    }

    fn fields(errors: &[FieldError]) -> Vec<&str> {
        errors.iter().map(|e| e.field).collect()
    }

    #[test]
    fn test_valid_details() {
        let appt = valid().validate(at()).unwrap();
        assert_eq!(appt.customer.contact_no, "9171234567");
        assert_eq!(appt.address, "12 Mabini St. Brgy. San Roque");
        assert_eq!(appt.service, ServiceKind::Cleaning);
        assert_eq!(appt.quantity, 1);
        assert_eq!(appt.scheduled_at, at());
    }

    #[test]
    fn test_collects_all_field_errors() {
        let errors = BookingDetails::default().validate(at()).unwrap_err();
        assert_eq!(
            fields(&errors),
            vec!["name", "address1", "email", "contact", "quantity", "service", "ac_type"]
        );
    }

    #[test]
    fn test_quantity_cap() {
        let mut details = valid();
        details.quantity = Some(3);
        let errors = details.validate(at()).unwrap_err();
        assert_eq!(errors[0].message, "Maximum of 2 units per time slot only!");

        details.quantity = Some(2);
        assert_eq!(details.validate(at()).unwrap().quantity, 2);

        details.quantity = Some(0);
        assert_eq!(fields(&details.validate(at()).unwrap_err()), vec!["quantity"]);
    }

    #[test]
    fn test_contact_number_must_be_ten_digits() {
        let mut details = valid();
        details.contact = "12345".to_string();
        assert_eq!(fields(&details.validate(at()).unwrap_err()), vec!["contact"]);

        details.contact = "91712345ab".to_string();
        assert!(details.validate(at()).is_err());
    }

    #[test]
    fn test_ac_type_required_without_item() {
        let mut details = valid();
        details.ac_type = Some(AcType::Unspecified);
        assert_eq!(fields(&details.validate(at()).unwrap_err()), vec!["ac_type"]);
    }

    #[test]
    fn test_item_forces_installation() {
        let mut details = valid();
        details.ac_unit = Some(4);
        details.ac_type = None;
        details.service = None;
        let appt = details.validate(at()).unwrap();
        assert_eq!(appt.service, ServiceKind::Installation);
        assert_eq!(appt.ac_type, AcType::Unspecified);
        assert_eq!(appt.ac_unit, Some(4));

        details.service = Some(ServiceKind::Repair);
        assert_eq!(fields(&details.validate(at()).unwrap_err()), vec!["service"]);
    }

    #[test]
    fn test_email_format() {
        assert!(is_valid_email("a@b.co"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("@b.co"));
        assert!(!is_valid_email("a b@c.co"));
        assert!(!is_valid_email("a@@b.co"));
        assert!(!is_valid_email("a@b..co"));
    }

    #[test]
    fn test_email_rejects_what_the_mailer_cannot_send() {
        for email in ["a\"b@example.com", "a(b)@example.com", "a,b@example.com"] {
            assert!(!is_valid_email(email), "{email} should be rejected");
            let mut details = valid();
            details.email = email.to_string();
            assert_eq!(fields(&details.validate(at()).unwrap_err()), vec!["email"]);
        }
    }
}
