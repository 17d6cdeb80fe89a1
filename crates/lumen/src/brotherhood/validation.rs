//! Form cleaning for every mutating operation.
//!
//! Forms carry the raw strings submitted by the browser. Cleaning parses them into typed
//! drafts and records one message per offending field, so a caller can redisplay the input
//! with every error at once instead of stopping at the first failure.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::domain::{
    calendar_age, CeremonyTypeId, DuesPeriod, MemberId, MemberState, PaymentState,
    ReferenceEntry, RoleId,
};

pub const NATIONAL_ID_MAX_LEN: usize = 9;
pub const NAME_MAX_LEN: usize = 100;
pub const REFERENCE_NAME_MAX_LEN: usize = 50;
pub const PHOTO_MAX_LEN: usize = 100;
pub const MAX_AGE: i32 = 120;
const AMOUNT_DECIMAL_PLACES: u32 = 2;
const AMOUNT_MAX_WHOLE_DIGITS: u32 = 6;

pub(crate) const REQUIRED: &str = "this field is required";
pub(crate) const INVALID_CHOICE: &str = "select a valid choice";

/// Field-scoped validation failures plus errors that belong to the form as a whole.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationErrors {
    pub fields: BTreeMap<&'static str, Vec<String>>,
    pub non_field: Vec<String>,
}

impl ValidationErrors {
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.fields.entry(field).or_default().push(message.into());
    }

    pub fn add_non_field(&mut self, message: impl Into<String>) {
        self.non_field.push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.non_field.is_empty()
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn field(&self, field: &str) -> &[String] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn single(field: &'static str, message: impl Into<String>) -> Self {
        let mut errors = Self::default();
        errors.add(field, message);
        errors
    }

    /// Returns `value` when no error was recorded.
    pub fn finish<T>(self, value: Option<T>) -> Result<T, Self> {
        match value {
            Some(value) if self.is_empty() => Ok(value),
            _ => Err(self),
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = self.non_field.clone();
        for (field, messages) in &self.fields {
            parts.extend(messages.iter().map(|message| format!("{field}: {message}")));
        }
        write!(f, "{}", parts.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

/// Editable member fields, as submitted by the admin create/edit forms.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemberForm {
    pub name: String,
    pub surname: String,
    pub national_id: String,
    pub birth_date: String,
    pub join_date: String,
    pub state: String,
    pub photo: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberDraft {
    pub name: String,
    pub surname: String,
    pub national_id: String,
    pub birth_date: NaiveDate,
    pub join_date: NaiveDate,
    pub state: MemberState,
    pub photo: Option<String>,
}

impl MemberForm {
    pub fn clean(&self, today: NaiveDate) -> Result<MemberDraft, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let draft = self.validate(today, &mut errors);
        errors.finish(draft)
    }

    pub(crate) fn validate(
        &self,
        today: NaiveDate,
        errors: &mut ValidationErrors,
    ) -> Option<MemberDraft> {
        let name = required_text(errors, "name", &self.name, NAME_MAX_LEN);
        let surname = required_text(errors, "surname", &self.surname, NAME_MAX_LEN);
        let national_id = national_id(errors, &self.national_id);
        let birth_date = required_date(errors, "birth_date", &self.birth_date);
        let join_date = required_date(errors, "join_date", &self.join_date);
        let state = choice(errors, "state", &self.state, MemberState::parse);
        let photo = optional_text(errors, "photo", &self.photo, PHOTO_MAX_LEN);

        if let Some(birth_date) = birth_date {
            check_birth_date(errors, birth_date, today);
            if let Some(join_date) = join_date {
                if join_date < birth_date {
                    errors.add("join_date", "join date cannot precede birth date");
                }
            }
        }

        Some(MemberDraft {
            name: name?,
            surname: surname?,
            national_id: national_id?,
            birth_date: birth_date?,
            join_date: join_date?,
            state: state?,
            photo: photo?,
        })
    }
}

/// Public sign-up form. Passwords are never echoed back to the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrationForm {
    pub name: String,
    pub surname: String,
    pub national_id: String,
    pub birth_date: String,
    pub photo: String,
    #[serde(skip_serializing)]
    pub password: String,
    #[serde(skip_serializing)]
    pub password2: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationDraft {
    pub member: MemberDraft,
    pub password: String,
}

impl RegistrationForm {
    /// Cleans the form; the join date of a self-registered member is `today`.
    pub fn clean(&self, today: NaiveDate) -> Result<RegistrationDraft, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let draft = self.validate(today, &mut errors);
        errors.finish(draft)
    }

    pub(crate) fn validate(
        &self,
        today: NaiveDate,
        errors: &mut ValidationErrors,
    ) -> Option<RegistrationDraft> {
        let name = required_text(errors, "name", &self.name, NAME_MAX_LEN);
        let surname = required_text(errors, "surname", &self.surname, NAME_MAX_LEN);
        let national_id = national_id(errors, &self.national_id);
        let birth_date = required_date(errors, "birth_date", &self.birth_date);
        let photo = optional_text(errors, "photo", &self.photo, PHOTO_MAX_LEN);

        if self.password.is_empty() {
            errors.add("password", REQUIRED);
        }
        if self.password2.is_empty() {
            errors.add("password2", REQUIRED);
        }
        if !self.password.is_empty()
            && !self.password2.is_empty()
            && self.password != self.password2
        {
            errors.add_non_field("passwords do not match");
        }

        if let Some(birth_date) = birth_date {
            check_birth_date(errors, birth_date, today);
        }

        Some(RegistrationDraft {
            member: MemberDraft {
                name: name?,
                surname: surname?,
                national_id: national_id?,
                birth_date: birth_date?,
                join_date: today,
                state: MemberState::Active,
                photo: photo?,
            },
            password: self.password.clone(),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DuesForm {
    pub amount: String,
    pub period: String,
    pub payment_state: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuesDraft {
    pub amount: Decimal,
    pub period: DuesPeriod,
    pub payment_state: PaymentState,
}

impl DuesForm {
    pub fn clean(&self) -> Result<DuesDraft, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let draft = self.validate(&mut errors);
        errors.finish(draft)
    }

    fn validate(&self, errors: &mut ValidationErrors) -> Option<DuesDraft> {
        dues_draft(
            errors,
            &self.amount,
            &self.period,
            &self.payment_state,
        )
    }
}

/// One amount, period and payment state applied to several members.
///
/// Each `members` entry is a member id or a comma-separated list of ids, so both a
/// multi-select (`members=1&members=2`) and a single text field (`members=1,2`) work.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BulkDuesForm {
    pub members: Vec<String>,
    pub amount: String,
    pub period: String,
    pub payment_state: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkDuesDraft {
    pub members: Vec<MemberId>,
    pub dues: DuesDraft,
}

impl BulkDuesForm {
    /// Builds the form from decoded body pairs, keeping every repeated `members` key.
    /// Unknown keys are ignored.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut form = Self::default();
        for (key, value) in pairs {
            match key.as_str() {
                "members" => form.members.push(value),
                "amount" => form.amount = value,
                "period" => form.period = value,
                "payment_state" => form.payment_state = value,
                _ => {}
            }
        }
        form
    }

    pub fn clean(&self) -> Result<BulkDuesDraft, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let members = member_selection(&mut errors, &self.members);
        let dues = dues_draft(
            &mut errors,
            &self.amount,
            &self.period,
            &self.payment_state,
        );
        let draft = match (members, dues) {
            (Some(members), Some(dues)) => Some(BulkDuesDraft { members, dues }),
            _ => None,
        };
        errors.finish(draft)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleAssignmentForm {
    pub role: String,
    pub start_date: String,
    pub end_date: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentDraft {
    pub role: RoleId,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl RoleAssignmentForm {
    pub fn clean(&self) -> Result<AssignmentDraft, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let role = required_id(&mut errors, "role", &self.role);
        let start_date = optional_date(&mut errors, "start_date", &self.start_date);
        let end_date = optional_date(&mut errors, "end_date", &self.end_date);
        let draft = (|| {
            Some(AssignmentDraft {
                role: RoleId(role?),
                start_date: start_date?,
                end_date: end_date?,
            })
        })();
        errors.finish(draft)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleRemovalForm {
    pub role: String,
}

impl RoleRemovalForm {
    pub fn clean(&self) -> Result<RoleId, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let role = required_id(&mut errors, "role", &self.role);
        errors.finish(role.map(RoleId))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CeremonyForm {
    pub ceremony_type: String,
    pub start_date: String,
    pub end_date: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CeremonyDraft {
    pub ceremony_type: CeremonyTypeId,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub description: Option<String>,
}

impl CeremonyForm {
    pub fn clean(&self) -> Result<CeremonyDraft, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let ceremony_type = required_id(&mut errors, "ceremony_type", &self.ceremony_type);
        let start_date = optional_date(&mut errors, "start_date", &self.start_date);
        let end_date = optional_date(&mut errors, "end_date", &self.end_date);
        let description = non_blank(&self.description);
        let draft = (|| {
            Some(CeremonyDraft {
                ceremony_type: CeremonyTypeId(ceremony_type?),
                start_date: start_date?,
                end_date: end_date?,
                description,
            })
        })();
        errors.finish(draft)
    }
}

/// Participant assignment; `segment` is the optional "tramo" number.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticipantForm {
    pub member: String,
    pub role: String,
    pub segment: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantDraft {
    pub member: MemberId,
    pub role: RoleId,
    pub segment: Option<i32>,
}

impl ParticipantForm {
    pub fn clean(&self) -> Result<ParticipantDraft, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let member = required_id(&mut errors, "member", &self.member);
        let role = required_id(&mut errors, "role", &self.role);
        let segment = match self.segment.trim() {
            "" => Some(None),
            raw => match raw.parse::<i32>() {
                Ok(value) => Some(Some(value)),
                Err(_) => {
                    errors.add("segment", "enter a whole number");
                    None
                }
            },
        };
        let draft = (|| {
            Some(ParticipantDraft {
                member: MemberId(member?),
                role: RoleId(role?),
                segment: segment?,
            })
        })();
        errors.finish(draft)
    }
}

/// Name and description for a role or ceremony type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceForm {
    pub name: String,
    pub description: String,
}

impl ReferenceForm {
    pub fn clean(&self) -> Result<ReferenceEntry, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let name = required_text(&mut errors, "name", &self.name, REFERENCE_NAME_MAX_LEN);
        let entry = name.map(|name| ReferenceEntry {
            name,
            description: non_blank(&self.description),
        });
        errors.finish(entry)
    }
}

fn check_birth_date(errors: &mut ValidationErrors, birth_date: NaiveDate, today: NaiveDate) {
    if birth_date > today {
        errors.add("birth_date", "birth date cannot be in the future");
    }
    let age = calendar_age(birth_date, today);
    if !(0..=MAX_AGE).contains(&age) {
        errors.add_non_field("invalid age");
    }
}

fn national_id(errors: &mut ValidationErrors, raw: &str) -> Option<String> {
    let value = raw.trim();
    if value.is_empty() {
        errors.add("national_id", REQUIRED);
        return None;
    }
    if value.chars().count() > NATIONAL_ID_MAX_LEN {
        errors.add(
            "national_id",
            format!("national ID cannot exceed {NATIONAL_ID_MAX_LEN} characters"),
        );
        return None;
    }
    Some(value.to_string())
}

fn dues_draft(
    errors: &mut ValidationErrors,
    amount: &str,
    period: &str,
    payment_state: &str,
) -> Option<DuesDraft> {
    let amount = dues_amount(errors, amount);
    let period = choice(errors, "period", period, DuesPeriod::parse);
    let payment_state = choice(errors, "payment_state", payment_state, PaymentState::parse);
    Some(DuesDraft {
        amount: amount?,
        period: period?,
        payment_state: payment_state?,
    })
}

fn dues_amount(errors: &mut ValidationErrors, raw: &str) -> Option<Decimal> {
    let raw = raw.trim();
    if raw.is_empty() {
        errors.add("amount", REQUIRED);
        return None;
    }
    let Ok(amount) = Decimal::from_str(raw) else {
        errors.add("amount", "enter a number");
        return None;
    };
    if amount <= Decimal::ZERO {
        errors.add("amount", "amount must be greater than zero");
        return None;
    }
    if amount.scale() > AMOUNT_DECIMAL_PLACES {
        errors.add(
            "amount",
            format!("ensure there are no more than {AMOUNT_DECIMAL_PLACES} decimal places"),
        );
        return None;
    }
    if amount.trunc() >= Decimal::from(10u64.pow(AMOUNT_MAX_WHOLE_DIGITS)) {
        errors.add(
            "amount",
            format!("ensure there are no more than {AMOUNT_MAX_WHOLE_DIGITS} digits before the decimal point"),
        );
        return None;
    }
    Some(amount)
}

fn member_selection(errors: &mut ValidationErrors, raw: &[String]) -> Option<Vec<MemberId>> {
    let mut members = Vec::new();
    let parts = raw
        .iter()
        .flat_map(|entry| entry.split(','))
        .map(str::trim)
        .filter(|part| !part.is_empty());
    for part in parts {
        match part.parse::<u64>() {
            Ok(id) if !members.contains(&MemberId(id)) => members.push(MemberId(id)),
            Ok(_) => {}
            Err(_) => {
                errors.add("members", format!("'{part}' is not a valid member"));
                return None;
            }
        }
    }
    if members.is_empty() {
        errors.add("members", "select at least one member");
        return None;
    }
    Some(members)
}

fn required_text(
    errors: &mut ValidationErrors,
    field: &'static str,
    raw: &str,
    max_len: usize,
) -> Option<String> {
    let value = raw.trim();
    if value.is_empty() {
        errors.add(field, REQUIRED);
        return None;
    }
    if value.chars().count() > max_len {
        errors.add(field, format!("ensure this value has at most {max_len} characters"));
        return None;
    }
    Some(value.to_string())
}

fn optional_text(
    errors: &mut ValidationErrors,
    field: &'static str,
    raw: &str,
    max_len: usize,
) -> Option<Option<String>> {
    match non_blank(raw) {
        Some(value) if value.chars().count() > max_len => {
            errors.add(field, format!("ensure this value has at most {max_len} characters"));
            None
        }
        value => Some(value),
    }
}

fn non_blank(raw: &str) -> Option<String> {
    let value = raw.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Parses a `YYYY-MM-DD` date, naming the raw value on failure.
pub fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

fn required_date(errors: &mut ValidationErrors, field: &'static str, raw: &str) -> Option<NaiveDate> {
    if raw.trim().is_empty() {
        errors.add(field, REQUIRED);
        return None;
    }
    match parse_date(raw) {
        Ok(date) => Some(date),
        Err(_) => {
            errors.add(field, "enter a valid date (YYYY-MM-DD)");
            None
        }
    }
}

fn optional_date(
    errors: &mut ValidationErrors,
    field: &'static str,
    raw: &str,
) -> Option<Option<NaiveDate>> {
    if raw.trim().is_empty() {
        return Some(None);
    }
    match parse_date(raw) {
        Ok(date) => Some(Some(date)),
        Err(_) => {
            errors.add(field, "enter a valid date (YYYY-MM-DD)");
            None
        }
    }
}

/// Blank selects the enum's default, mirroring the model defaults.
fn choice<T: Default>(
    errors: &mut ValidationErrors,
    field: &'static str,
    raw: &str,
    parse: fn(&str) -> Option<T>,
) -> Option<T> {
    if raw.trim().is_empty() {
        return Some(T::default());
    }
    let parsed = parse(raw);
    if parsed.is_none() {
        errors.add(field, INVALID_CHOICE);
    }
    parsed
}

pub(crate) fn required_id(errors: &mut ValidationErrors, field: &'static str, raw: &str) -> Option<u64> {
    let raw = raw.trim();
    if raw.is_empty() {
        errors.add(field, REQUIRED);
        return None;
    }
    match raw.parse::<u64>() {
        Ok(id) => Some(id),
        Err(_) => {
            errors.add(field, INVALID_CHOICE);
            None
        }
    }
}

/// Query-string filter: blank or absent means "no filter".
pub(crate) fn optional_filter(
    field: &'static str,
    raw: Option<&str>,
) -> Result<Option<u64>, ValidationErrors> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => raw
            .parse::<u64>()
            .map(Some)
            .map_err(|_| ValidationErrors::single(field, INVALID_CHOICE)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).expect("valid date")
    }

    fn member_form() -> MemberForm {
        MemberForm {
            name: "Manuel".to_string(),
            surname: "Ruiz Ortega".to_string(),
            national_id: "12345678A".to_string(),
            birth_date: "1980-03-02".to_string(),
            join_date: "1995-04-10".to_string(),
            state: String::new(),
            photo: String::new(),
        }
    }

    #[test]
    fn clean_member_defaults_state_and_photo() {
        let draft = member_form().clean(today()).expect("valid member");
        assert_eq!(draft.state, MemberState::Active);
        assert_eq!(draft.photo, None);
        assert_eq!(draft.surname, "Ruiz Ortega");
    }

    #[test]
    fn join_date_before_birth_date_is_a_join_date_error() {
        let mut form = member_form();
        form.birth_date = "2000-01-01".to_string();
        form.join_date = "1999-01-01".to_string();

        let errors = form.clean(today()).expect_err("join before birth rejected");
        assert_eq!(errors.field("join_date"), ["join date cannot precede birth date"]);
        assert!(!errors.has_field("birth_date"));
    }

    #[test]
    fn future_birth_date_is_rejected() {
        let mut form = member_form();
        form.birth_date = "2025-06-02".to_string();
        form.join_date = "2025-06-02".to_string();

        let errors = form.clean(today()).expect_err("future birth rejected");
        assert_eq!(errors.field("birth_date"), ["birth date cannot be in the future"]);
        assert!(errors.non_field.is_empty(), "same-year birth still has age 0");
    }

    #[test]
    fn age_outside_bounds_is_a_non_field_error() {
        let mut form = member_form();
        form.birth_date = "1904-12-31".to_string();
        let errors = form.clean(today()).expect_err("age 121 rejected");
        assert_eq!(errors.non_field, ["invalid age"]);

        form.birth_date = "1905-01-01".to_string();
        assert!(form.clean(today()).is_ok(), "age 120 accepted");

        form.birth_date = "2026-01-01".to_string();
        let errors = form.clean(today()).expect_err("negative age rejected");
        assert!(errors.has_field("birth_date"));
        assert_eq!(errors.non_field, ["invalid age"]);
    }

    #[test]
    fn national_id_longer_than_nine_characters_is_rejected() {
        let mut form = member_form();
        form.national_id = "123456789AB".to_string();
        let errors = form.clean(today()).expect_err("long national id rejected");
        assert_eq!(errors.field("national_id").len(), 1);
    }

    #[test]
    fn every_offending_field_is_reported() {
        let form = MemberForm {
            state: "retired".to_string(),
            birth_date: "02/03/1980".to_string(),
            ..MemberForm::default()
        };
        let errors = form.clean(today()).expect_err("empty form rejected");
        for field in ["name", "surname", "national_id", "birth_date", "join_date", "state"] {
            assert!(errors.has_field(field), "missing error for {field}");
        }
    }

    #[test]
    fn registration_requires_matching_passwords() {
        let form = RegistrationForm {
            name: "Lucía".to_string(),
            surname: "Martín".to_string(),
            national_id: "87654321B".to_string(),
            birth_date: "1990-05-05".to_string(),
            photo: String::new(),
            password: "cirio-2025".to_string(),
            password2: "cirio-2024".to_string(),
        };
        let errors = form.clean(today()).expect_err("mismatch rejected");
        assert_eq!(errors.non_field, ["passwords do not match"]);
        assert!(errors.fields.is_empty());

        let form = RegistrationForm {
            password2: "cirio-2025".to_string(),
            ..form
        };
        let draft = form.clean(today()).expect("valid registration");
        assert_eq!(draft.member.join_date, today());
        assert_eq!(draft.password, "cirio-2025");
    }

    #[test]
    fn registration_never_serializes_passwords() {
        let form = RegistrationForm {
            password: "secret".to_string(),
            password2: "secret".to_string(),
            ..RegistrationForm::default()
        };
        let json = serde_json::to_value(&form).expect("serializes");
        assert!(json.get("password").is_none());
        assert!(json.get("password2").is_none());
    }

    #[test]
    fn dues_amount_must_be_positive() {
        for amount in ["0", "-5", "0.00"] {
            let form = DuesForm {
                amount: amount.to_string(),
                ..DuesForm::default()
            };
            let errors = form.clean().expect_err("non-positive rejected");
            assert_eq!(errors.field("amount"), ["amount must be greater than zero"]);
        }
    }

    #[test]
    fn dues_amount_respects_decimal_shape() {
        let form = DuesForm {
            amount: "12.345".to_string(),
            ..DuesForm::default()
        };
        assert!(form.clean().expect_err("three decimals").has_field("amount"));

        let form = DuesForm {
            amount: "1000000".to_string(),
            ..DuesForm::default()
        };
        assert!(form.clean().expect_err("seven whole digits").has_field("amount"));

        let form = DuesForm {
            amount: "999999.99".to_string(),
            period: "second-half".to_string(),
            payment_state: "paid".to_string(),
        };
        let draft = form.clean().expect("max amount accepted");
        assert_eq!(draft.period, DuesPeriod::SecondHalf);
        assert_eq!(draft.payment_state, PaymentState::Paid);
    }

    #[test]
    fn bulk_selection_is_deduplicated_and_required() {
        let form = BulkDuesForm {
            members: vec!["3, 1".to_string(), "3,,2".to_string()],
            amount: "25.00".to_string(),
            period: "first-half".to_string(),
            payment_state: "Pending".to_string(),
        };
        let draft = form.clean().expect("valid bulk form");
        assert_eq!(draft.members, vec![MemberId(3), MemberId(1), MemberId(2)]);

        let form = BulkDuesForm {
            members: vec![" , ".to_string(), String::new()],
            ..form
        };
        let errors = form.clean().expect_err("empty selection rejected");
        assert_eq!(errors.field("members"), ["select at least one member"]);
    }

    #[test]
    fn parse_date_names_the_rejected_value() {
        assert_eq!(
            parse_date(" 2025-04-13 "),
            Ok(NaiveDate::from_ymd_opt(2025, 4, 13).expect("valid date"))
        );
        let err = parse_date("13/04/2025").expect_err("day-first format rejected");
        assert!(err.contains("'13/04/2025'"));
    }

    #[test]
    fn bulk_form_collects_repeated_member_keys() {
        let form = BulkDuesForm::from_pairs([
            ("members".to_string(), "1".to_string()),
            ("amount".to_string(), "12.50".to_string()),
            ("members".to_string(), "2".to_string()),
            ("csrf".to_string(), "ignored".to_string()),
        ]);
        assert_eq!(form.members, ["1", "2"]);
        assert_eq!(form.amount, "12.50");
        let draft = form.clean().expect("valid bulk form");
        assert_eq!(draft.members, vec![MemberId(1), MemberId(2)]);
    }

    #[test]
    fn participant_segment_is_optional_but_numeric() {
        let form = ParticipantForm {
            member: "4".to_string(),
            role: "2".to_string(),
            segment: String::new(),
        };
        assert_eq!(form.clean().expect("valid").segment, None);

        let form = ParticipantForm {
            segment: "tercero".to_string(),
            ..form
        };
        assert!(form.clean().expect_err("non numeric").has_field("segment"));
    }

    #[test]
    fn assignment_dates_are_optional() {
        let form = RoleAssignmentForm {
            role: "1".to_string(),
            start_date: "2024-01-01".to_string(),
            end_date: String::new(),
        };
        let draft = form.clean().expect("valid assignment");
        assert_eq!(draft.start_date, NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(draft.end_date, None);
    }
}
