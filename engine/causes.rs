//! The outcome-name table.
//!
//! Seventy outcomes in SCI column order: three pregnancy states, sixty-one causes of
//! death (each with its group code), and six circumstances of mortality.

use crate::layout::{BLOCK_A, BLOCK_B, BLOCK_C, OUTCOMES};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    /// Group code of a cause of death, empty for pregnancy states and circumstances.
    pub group: &'static str,
    pub label: &'static str,
}

const fn outcome(group: &'static str, label: &'static str) -> Outcome {
    Outcome { group, label }
}

pub const OUTCOME_TABLE: [Outcome; OUTCOMES] = [
    outcome("", "Not pregnant or recently delivered"),
    outcome("", "Pregnancy ended within 6 weeks of death"),
    outcome("", "Pregnant at death"),
    outcome("01.01", "Sepsis (non-obstetric)"),
    outcome("01.02", "Acute resp infect incl pneumonia"),
    outcome("01.03", "HIV/AIDS related death"),
    outcome("01.04", "Diarrhoeal diseases"),
    outcome("01.05", "Malaria"),
    outcome("01.06", "Measles"),
    outcome("01.07", "Meningitis and encephalitis"),
    outcome("01.08", "Tetanus"),
    outcome("01.09", "Pulmonary tuberculosis"),
    outcome("01.10", "Pertussis"),
    outcome("01.11", "Haemorrhagic fever"),
    outcome("01.99", "Other and unspecified infect dis"),
    outcome("02.01", "Oral neoplasms"),
    outcome("02.02", "Digestive neoplasms"),
    outcome("02.03", "Respiratory neoplasms"),
    outcome("02.04", "Breast neoplasms"),
    outcome("02.05", "Reproductive neoplasms F"),
    outcome("02.06", "Reproductive neoplasms M"),
    outcome("02.99", "Other and unspecified neoplasms"),
    outcome("03.01", "Severe anaemia"),
    outcome("03.02", "Severe malnutrition"),
    outcome("03.03", "Diabetes mellitus"),
    outcome("04.01", "Acute cardiac disease"),
    outcome("04.02", "Stroke"),
    outcome("04.03", "Sickle cell with crisis"),
    outcome("04.99", "Other and unspecified cardiac dis"),
    outcome("05.01", "Chronic obstructive pulmonary dis"),
    outcome("05.02", "Asthma"),
    outcome("06.01", "Acute abdomen"),
    outcome("06.02", "Liver cirrhosis"),
    outcome("07.01", "Renal failure"),
    outcome("08.01", "Epilepsy"),
    outcome("09.01", "Ectopic pregnancy"),
    outcome("09.02", "Abortion-related death"),
    outcome("09.03", "Pregnancy-induced hypertension"),
    outcome("09.04", "Obstetric haemorrhage"),
    outcome("09.05", "Obstructed labour"),
    outcome("09.06", "Pregnancy-related sepsis"),
    outcome("09.07", "Anaemia of pregnancy"),
    outcome("09.08", "Ruptured uterus"),
    outcome("09.99", "Other and unspecified maternal CoD"),
    outcome("10.01", "Prematurity"),
    outcome("10.02", "Birth asphyxia"),
    outcome("10.03", "Neonatal pneumonia"),
    outcome("10.04", "Neonatal sepsis"),
    outcome("10.05", "Congenital malformation"),
    outcome("10.99", "Other and unspecified neonatal CoD"),
    outcome("11.01", "Fresh stillbirth"),
    outcome("11.02", "Macerated stillbirth"),
    outcome("12.01", "Road traffic accident"),
    outcome("12.02", "Other transport accident"),
    outcome("12.03", "Accid fall"),
    outcome("12.04", "Accid drowning and submersion"),
    outcome("12.05", "Accid expos to smoke fire & flame"),
    outcome("12.06", "Contact with venomous plant/animal"),
    outcome("12.07", "Accid poisoning & noxious subs"),
    outcome("12.08", "Intentional self-harm"),
    outcome("12.09", "Assault"),
    outcome("12.10", "Exposure to force of nature"),
    outcome("12.99", "Other and unspecified external CoD"),
    outcome("98", "Other and unspecified NCD"),
    outcome("", "Culture"),
    outcome("", "Emergency"),
    outcome("", "Health literacy"),
    outcome("", "Inevitable"),
    outcome("", "Logistics"),
    outcome("", "Resources"),
];

/// Reported as the circumstance when no single category dominates.
pub const MULTIPLE: &str = "Multiple";

/// Appended to a CSMF when mass could not be assigned to a reported cause.
pub const UNDETERMINED: &str = "Undetermined";

impl Outcome {
    /// The display name, optionally prefixed with the group code.
    pub fn name(&self, groupcode: bool) -> String {
        if groupcode && !self.group.is_empty() {
            format!("{} {}", self.group, self.label)
        } else {
            self.label.to_string()
        }
    }
}

/// Name of the outcome at `index` of the 70-entry vector.
pub fn outcome_name(index: usize, groupcode: bool) -> String {
    OUTCOME_TABLE[index].name(groupcode)
}

/// Name of the cause at `index` within block B.
pub fn cause_name(index: usize, groupcode: bool) -> String {
    outcome_name(BLOCK_B.start + index, groupcode)
}

/// Name of the pregnancy state at `index` within block A.
pub fn pregnancy_name(index: usize) -> &'static str {
    OUTCOME_TABLE[BLOCK_A.start + index].label
}

/// Name of the circumstance category at `index` within block C.
pub fn circumstance_name(index: usize) -> &'static str {
    OUTCOME_TABLE[BLOCK_C.start + index].label
}

/// All seventy names, in column order.
pub fn outcome_names(groupcode: bool) -> Vec<String> {
    OUTCOME_TABLE.iter().map(|o| o.name(groupcode)).collect()
}
