//! Raffle creation wizard.
//!
//! The organizer fills a [`RaffleDraft`] over four steps. Each step is
//! validated before the wizard moves on, and the whole draft is validated
//! again before it becomes a [`RaffleInput`].

use crate::colors;
use crate::pool::{self, RaffleType};
use crate::reconciler::normalize_label;
use crate::types::{ElementLabel, Money, PaymentInfo, Prize, RaffleInput};
use chrono::{DateTime, Utc};
use sorteohub_core::environment::Clock;
use std::collections::HashSet;
use std::fmt;

/// Largest pool a numeric raffle may declare
pub const MAX_NUMERIC_ELEMENTS: usize = 10_000;

/// Default pool size for a new numeric raffle
pub const DEFAULT_ELEMENT_COUNT: usize = 100;

const TITLE_MIN_CHARS: usize = 3;
const TITLE_MAX_CHARS: usize = 100;
const DESCRIPTION_MAX_CHARS: usize = 2_000;

/// Wizard steps, in order
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum WizardStep {
    /// Title, description, category
    #[default]
    Basics,
    /// Element type, count, unit price
    Elements,
    /// Prize list
    Prizes,
    /// Payment info, end date, privacy
    Payment,
}

impl WizardStep {
    /// Every step, in order
    pub const ALL: [Self; 4] = [Self::Basics, Self::Elements, Self::Prizes, Self::Payment];

    /// The step after this one
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Basics => Some(Self::Elements),
            Self::Elements => Some(Self::Prizes),
            Self::Prizes => Some(Self::Payment),
            Self::Payment => None,
        }
    }

    /// The step before this one
    #[must_use]
    pub const fn previous(self) -> Option<Self> {
        match self {
            Self::Basics => None,
            Self::Elements => Some(Self::Basics),
            Self::Prizes => Some(Self::Elements),
            Self::Payment => Some(Self::Prizes),
        }
    }
}

/// A field-level validation failure
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Draft field the message belongs to
    pub field: &'static str,
    /// Message shown next to the field
    pub message: String,
}

impl ValidationIssue {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Raffle under construction
#[derive(Clone, Debug, PartialEq)]
pub struct RaffleDraft {
    /// Title
    pub title: String,
    /// Description
    pub description: String,
    /// Optional category
    pub category: Option<String>,
    /// Price per element
    pub unit_price: Money,
    /// Prizes
    pub prizes: Vec<Prize>,
    /// Payment instructions
    pub payment_info: PaymentInfo,
    /// Closing date
    pub ends_at: Option<DateTime<Utc>>,
    /// Hidden from the public listing
    pub private: bool,
    raffle_type: RaffleType,
    count: usize,
    elements: Vec<ElementLabel>,
}

impl Default for RaffleDraft {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            category: None,
            unit_price: Money::ZERO,
            prizes: Vec::new(),
            payment_info: PaymentInfo::default(),
            ends_at: None,
            private: false,
            raffle_type: RaffleType::Numeros,
            count: DEFAULT_ELEMENT_COUNT,
            elements: pool::generate(RaffleType::Numeros, DEFAULT_ELEMENT_COUNT),
        }
    }
}

impl RaffleDraft {
    /// Element type
    #[must_use]
    pub const fn raffle_type(&self) -> RaffleType {
        self.raffle_type
    }

    /// Requested pool size
    #[must_use]
    pub const fn element_count(&self) -> usize {
        self.count
    }

    /// The pool as it will be submitted
    #[must_use]
    pub fn elements(&self) -> &[ElementLabel] {
        &self.elements
    }

    /// Largest count the current type allows
    #[must_use]
    pub fn max_count(&self) -> usize {
        pool::max_elements(self.raffle_type).unwrap_or(MAX_NUMERIC_ELEMENTS)
    }

    /// Change the element type, clamping the count and regenerating the pool
    pub fn set_raffle_type(&mut self, raffle_type: RaffleType) {
        self.raffle_type = raffle_type;
        if let Some(max) = pool::max_elements(raffle_type) {
            // non-numeric types default to their full reference list
            self.count = max;
        }
        self.count = self.count.clamp(1, self.max_count());
        self.reset_elements();
    }

    /// Change the pool size, clamped to `1..=max_count()`, and regenerate
    pub fn set_element_count(&mut self, count: usize) {
        self.count = count.clamp(1, self.max_count());
        self.reset_elements();
    }

    /// Regenerate the pool from the type and count, discarding edits
    pub fn reset_elements(&mut self) {
        self.elements = pool::generate(self.raffle_type, self.count);
    }

    /// Rename one element
    ///
    /// Returns `false` if `index` is out of range or the label is blank.
    /// Duplicates are accepted here and reported by validation.
    pub fn rename_element(&mut self, index: usize, label: impl Into<String>) -> bool {
        let label = label.into();
        let label = label.trim();
        if label.is_empty() {
            return false;
        }
        let Some(slot) = self.elements.get_mut(index) else {
            return false;
        };
        // only canonical integers in a numeric raffle become numbers; "007" stays text
        let number = label
            .parse::<i64>()
            .ok()
            .filter(|n| self.raffle_type == RaffleType::Numeros && n.to_string() == label);
        *slot = number.map_or_else(|| ElementLabel::Text(label.to_string()), ElementLabel::Number);
        true
    }

    /// Color names not yet used by a color raffle's pool
    #[must_use]
    pub fn color_suggestions(&self) -> Vec<&'static str> {
        if self.raffle_type != RaffleType::Colores {
            return Vec::new();
        }
        let used: Vec<String> = self.elements.iter().map(normalize_label).collect();
        colors::available_suggestions(&used)
    }

    /// Issues for a single step
    #[must_use]
    pub fn validate_step(&self, step: WizardStep, clock: &dyn Clock) -> Vec<ValidationIssue> {
        match step {
            WizardStep::Basics => self.validate_basics(),
            WizardStep::Elements => self.validate_elements(),
            WizardStep::Prizes => self.validate_prizes(),
            WizardStep::Payment => self.validate_payment(clock.now()),
        }
    }

    /// Issues for every step, in step order
    #[must_use]
    pub fn validate_all(&self, clock: &dyn Clock) -> Vec<ValidationIssue> {
        WizardStep::ALL
            .into_iter()
            .flat_map(|step| self.validate_step(step, clock))
            .collect()
    }

    /// Build the request body
    ///
    /// # Errors
    ///
    /// Returns every validation issue if the draft is incomplete.
    pub fn to_input(&self, clock: &dyn Clock) -> Result<RaffleInput, Vec<ValidationIssue>> {
        let issues = self.validate_all(clock);
        let Some(ends_at) = self.ends_at.filter(|_| issues.is_empty()) else {
            return Err(issues);
        };

        let category = self
            .category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string);

        Ok(RaffleInput {
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            category,
            raffle_type: self.raffle_type,
            pool: self.elements.clone(),
            unit_price: self.unit_price,
            ends_at,
            prizes: self.prizes.clone(),
            payment_info: self.payment_info.clone(),
            private: self.private,
        })
    }

    fn validate_basics(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        let title = self.title.trim().chars().count();
        if title < TITLE_MIN_CHARS {
            issues.push(ValidationIssue::new(
                "title",
                format!("El título debe tener al menos {TITLE_MIN_CHARS} caracteres"),
            ));
        } else if title > TITLE_MAX_CHARS {
            issues.push(ValidationIssue::new(
                "title",
                format!("El título no puede superar {TITLE_MAX_CHARS} caracteres"),
            ));
        }
        if self.description.chars().count() > DESCRIPTION_MAX_CHARS {
            issues.push(ValidationIssue::new(
                "description",
                format!("La descripción no puede superar {DESCRIPTION_MAX_CHARS} caracteres"),
            ));
        }
        issues
    }

    fn validate_elements(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        if self.unit_price.is_zero() {
            issues.push(ValidationIssue::new("unit_price", "El precio debe ser mayor a cero"));
        }
        if self.elements.is_empty() {
            issues.push(ValidationIssue::new("elements", "La rifa necesita al menos un elemento"));
        }

        let mut seen = HashSet::with_capacity(self.elements.len());
        let duplicates: Vec<String> = self
            .elements
            .iter()
            .map(normalize_label)
            .filter(|key| !seen.insert(key.clone()))
            .collect();
        if !duplicates.is_empty() {
            issues.push(ValidationIssue::new(
                "elements",
                format!("Elementos repetidos: {}", duplicates.join(", ")),
            ));
        }
        issues
    }

    fn validate_prizes(&self) -> Vec<ValidationIssue> {
        if self.prizes.is_empty() {
            return vec![ValidationIssue::new("prizes", "Agrega al menos un premio")];
        }
        if self.prizes.iter().any(|p| p.name.trim().is_empty()) {
            return vec![ValidationIssue::new("prizes", "Cada premio necesita un nombre")];
        }
        Vec::new()
    }

    fn validate_payment(&self, now: DateTime<Utc>) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        if self.payment_info.method.trim().is_empty() {
            issues.push(ValidationIssue::new("payment_info", "Indica un método de pago"));
        }
        match self.ends_at {
            None => issues.push(ValidationIssue::new("ends_at", "Indica la fecha de cierre")),
            Some(ends_at) if ends_at <= now => {
                issues.push(ValidationIssue::new("ends_at", "La fecha de cierre debe ser futura"));
            },
            Some(_) => {},
        }
        issues
    }
}

/// Step-by-step driver around a [`RaffleDraft`]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CreationWizard {
    /// Draft being edited
    pub draft: RaffleDraft,
    step: WizardStep,
}

impl CreationWizard {
    /// Start at the first step with an empty draft
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume editing an existing draft at the first step
    #[must_use]
    pub fn with_draft(draft: RaffleDraft) -> Self {
        Self {
            draft,
            step: WizardStep::Basics,
        }
    }

    /// Current step
    #[must_use]
    pub const fn step(&self) -> WizardStep {
        self.step
    }

    /// Validate the current step and move forward
    ///
    /// On the last step this stays put once it validates.
    ///
    /// # Errors
    ///
    /// Returns the current step's issues; the step does not change.
    pub fn advance(&mut self, clock: &dyn Clock) -> Result<WizardStep, Vec<ValidationIssue>> {
        let issues = self.draft.validate_step(self.step, clock);
        if !issues.is_empty() {
            tracing::debug!(step = ?self.step, issues = issues.len(), "Wizard step rejected");
            return Err(issues);
        }
        if let Some(next) = self.step.next() {
            self.step = next;
        }
        Ok(self.step)
    }

    /// Go back one step without validating
    pub fn back(&mut self) -> WizardStep {
        if let Some(previous) = self.step.previous() {
            self.step = previous;
        }
        self.step
    }

    /// Validate everything and produce the request body
    ///
    /// # Errors
    ///
    /// Returns every outstanding issue; the wizard jumps to the first step
    /// that has one.
    pub fn finish(&mut self, clock: &dyn Clock) -> Result<RaffleInput, Vec<ValidationIssue>> {
        self.draft.to_input(clock).inspect_err(|_| {
            if let Some(step) = WizardStep::ALL
                .into_iter()
                .find(|step| !self.draft.validate_step(*step, clock).is_empty())
            {
                self.step = step;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use chrono::Duration;
    use sorteohub_testing::test_clock;

    fn complete_draft() -> RaffleDraft {
        RaffleDraft {
            title: "Rifa navideña".to_string(),
            unit_price: Money::from_units(50),
            prizes: vec![Prize::named("Televisión")],
            payment_info: PaymentInfo {
                method: "Transferencia".to_string(),
                instructions: "CLABE 0123".to_string(),
            },
            ends_at: Some(test_clock().now() + Duration::days(7)),
            ..RaffleDraft::default()
        }
    }

    fn fields(issues: &[ValidationIssue]) -> Vec<&'static str> {
        issues.iter().map(|i| i.field).collect()
    }

    #[test]
    fn complete_draft_builds_input() {
        let input = complete_draft().to_input(&test_clock()).unwrap();
        assert_eq!(input.pool.len(), DEFAULT_ELEMENT_COUNT);
        assert_eq!(input.pool[0], ElementLabel::Number(1));
        assert_eq!(input.unit_price, Money::from_units(50));
        assert_eq!(input.category, None);
    }

    #[test]
    fn empty_prizes_are_rejected() {
        let draft = RaffleDraft {
            prizes: vec![],
            ..complete_draft()
        };
        let issues = draft.validate_step(WizardStep::Prizes, &test_clock());
        assert_eq!(fields(&issues), vec!["prizes"]);
    }

    #[test]
    fn past_end_date_is_rejected() {
        let clock = test_clock();
        let draft = RaffleDraft {
            ends_at: Some(clock.now() - Duration::hours(1)),
            ..complete_draft()
        };
        assert_eq!(fields(&draft.validate_step(WizardStep::Payment, &clock)), vec!["ends_at"]);

        // the deadline moves with the clock
        let draft = complete_draft();
        clock.advance(Duration::days(8));
        assert_eq!(fields(&draft.validate_step(WizardStep::Payment, &clock)), vec!["ends_at"]);
    }

    #[test]
    fn count_is_clamped_to_reference_size() {
        let mut draft = RaffleDraft::default();
        draft.set_raffle_type(RaffleType::Cartas);
        assert_eq!(draft.element_count(), 52);

        draft.set_element_count(500);
        assert_eq!(draft.element_count(), 52);
        assert_eq!(draft.elements().len(), 52);

        draft.set_element_count(0);
        assert_eq!(draft.element_count(), 1);

        draft.set_raffle_type(RaffleType::Numeros);
        draft.set_element_count(50_000);
        assert_eq!(draft.element_count(), MAX_NUMERIC_ELEMENTS);
    }

    #[test]
    fn reset_matches_generator() {
        let mut draft = RaffleDraft::default();
        draft.set_raffle_type(RaffleType::Abecedario);
        draft.set_element_count(5);
        assert!(draft.rename_element(0, "Z"));
        draft.reset_elements();
        assert_eq!(draft.elements(), pool::generate(RaffleType::Abecedario, 5).as_slice());
    }

    #[test]
    fn renamed_duplicates_are_reported() {
        let mut draft = complete_draft();
        draft.set_element_count(3);
        assert!(draft.rename_element(2, " 1 "));
        assert!(!draft.rename_element(9, "x"));
        assert!(!draft.rename_element(0, "   "));

        let issues = draft.validate_step(WizardStep::Elements, &test_clock());
        assert_eq!(fields(&issues), vec!["elements"]);
        assert!(issues[0].message.contains('1'));
    }

    #[test]
    fn renamed_labels_keep_their_text() {
        let mut draft = RaffleDraft::default();
        draft.set_element_count(3);
        assert!(draft.rename_element(0, "007"));
        assert!(draft.rename_element(1, "12"));
        assert_eq!(draft.elements()[0], ElementLabel::Text("007".to_string()));
        assert_eq!(draft.elements()[1], ElementLabel::Number(12));

        draft.set_raffle_type(RaffleType::Cartas);
        assert!(draft.rename_element(0, "10"));
        assert_eq!(draft.elements()[0], ElementLabel::Text("10".to_string()));
    }

    #[test]
    fn color_suggestions_skip_used_names() {
        let mut draft = RaffleDraft::default();
        assert!(draft.color_suggestions().is_empty());

        draft.set_raffle_type(RaffleType::Colores);
        draft.set_element_count(2);
        let suggestions = draft.color_suggestions();
        assert_eq!(suggestions.len(), colors::COLOR_TABLE.len() - 2);
        assert!(!suggestions.contains(&"rojo"));
    }

    #[test]
    fn wizard_stops_on_invalid_step() {
        let clock = test_clock();
        let mut wizard = CreationWizard::new();
        assert!(wizard.advance(&clock).is_err());
        assert_eq!(wizard.step(), WizardStep::Basics);

        wizard.draft.title = "Mi rifa".to_string();
        assert_eq!(wizard.advance(&clock).unwrap(), WizardStep::Elements);
        assert_eq!(fields(&wizard.advance(&clock).unwrap_err()), vec!["unit_price"]);
        assert_eq!(wizard.back(), WizardStep::Basics);
        assert_eq!(wizard.back(), WizardStep::Basics);
    }

    #[test]
    fn finish_jumps_to_first_invalid_step() {
        let clock = test_clock();
        let mut wizard = CreationWizard::with_draft(RaffleDraft {
            prizes: vec![],
            ..complete_draft()
        });
        for _ in 0..3 {
            let _ = wizard.advance(&clock);
        }
        assert_eq!(wizard.step(), WizardStep::Prizes);

        wizard.draft.prizes.push(Prize::named("Bicicleta"));
        wizard.advance(&clock).unwrap();
        wizard.draft.ends_at = None;
        assert!(wizard.finish(&clock).is_err());
        assert_eq!(wizard.step(), WizardStep::Payment);

        wizard.draft.ends_at = Some(clock.now() + Duration::days(1));
        assert_eq!(wizard.finish(&clock).unwrap().prizes.len(), 1);
    }
}
