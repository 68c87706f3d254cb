//! Canonical text rendering of an `EncounterProfile`.
//!
//! The output is the generation input, so it must be byte-identical for
//! equal profiles: fixed section and field order, fixed number and date
//! formats, no clocks, no hash-map iteration. Absent fields are left out;
//! a field recorded as an empty string is shown as such.

use std::fmt::Display;

use base64::Engine;
use sha2::{Digest, Sha256};

use crate::models::{
    ClinicalEvent, Encounter, EncounterProfile, EventKind, ObservationValue, Organization,
    Patient, Payer, Provider, Temporal,
};

const EMPTY_MARKER: &str = "(recorded empty)";

struct Block {
    out: String,
}

impl Block {
    fn new() -> Self {
        Self { out: String::new() }
    }

    fn heading(&mut self, title: &str) {
        if !self.out.is_empty() {
            self.out.push('\n');
        }
        self.out.push_str(title);
        self.out.push('\n');
    }

    fn line(&mut self, indent: usize, content: &str) {
        self.out.push_str(&" ".repeat(indent));
        self.out.push_str(content);
        self.out.push('\n');
    }

    fn field(&mut self, label: &str, value: Option<impl Display>) {
        if let Some(v) = value {
            self.line(2, &format!("{label}: {v}"));
        }
    }

    fn text(&mut self, label: &str, value: Option<&str>) {
        self.field(label, value.map(show_text));
    }

    fn item(&mut self, content: &str) {
        self.line(2, &format!("- {content}"));
    }

    fn detail(&mut self, label: &str, value: Option<impl Display>) {
        if let Some(v) = value {
            self.line(4, &format!("{label}: {v}"));
        }
    }

    fn detail_text(&mut self, label: &str, value: Option<&str>) {
        self.detail(label, value.map(show_text));
    }
}

fn show_text(s: &str) -> &str {
    if s.trim().is_empty() {
        EMPTY_MARKER
    } else {
        s
    }
}

fn money(v: Option<f64>) -> Option<String> {
    v.map(|n| format!("${n:.2}"))
}

/// `Description [SYSTEM code]`, or whichever half is recorded.
fn coded(description: Option<&str>, system: &str, code: Option<&str>) -> Option<String> {
    match (description, code) {
        (Some(d), Some(c)) => Some(format!("{} [{system} {c}]", show_text(d))),
        (Some(d), None) => Some(show_text(d).to_string()),
        (None, Some(c)) => Some(format!("[{system} {c}]")),
        (None, None) => None,
    }
}

/// Event headline: `date: label`, dropping whichever part is absent.
fn headline(date: Option<&Temporal>, label: Option<String>, kind: EventKind) -> String {
    let label = label.unwrap_or_else(|| format!("unspecified {}", kind.as_str().replace('_', " ")));
    match date {
        Some(d) => format!("{d}: {label}"),
        None => label,
    }
}

fn duration_minutes(start: Option<&Temporal>, stop: Option<&Temporal>) -> Option<String> {
    match (start?, stop?) {
        (Temporal::DateTime(a), Temporal::DateTime(b)) => {
            let minutes = (*b - *a).num_minutes();
            Some(match minutes {
                m if m < 120 => format!("{m} minutes"),
                m if m < 48 * 60 => format!("{} hours {} minutes", m / 60, m % 60),
                m => format!("{} days", m / (24 * 60)),
            })
        }
        _ => None,
    }
}

fn render_encounter(b: &mut Block, e: &Encounter, has_payer: bool) {
    b.heading("ENCOUNTER");
    b.field("Id", Some(&e.id));
    b.text("Class", e.encounter_class.as_deref());
    b.field("Type", coded(e.description.as_deref(), "SNOMED", e.code.as_deref()));
    b.field("Start", e.start.as_ref());
    b.field("Stop", e.stop.as_ref());
    b.field("Duration", duration_minutes(e.start.as_ref(), e.stop.as_ref()));
    b.field("Reason", coded(e.reason_description.as_deref(), "SNOMED", e.reason_code.as_deref()));
    b.field("Base encounter cost", money(e.base_encounter_cost));
    b.field("Total claim cost", money(e.total_claim_cost));
    b.field("Payer coverage", money(e.payer_coverage));
    if !has_payer {
        b.field("Coverage", Some("self-pay or unknown payer"));
    }
}

fn render_patient(b: &mut Block, p: &Patient, encounter: &Encounter) {
    b.heading("PATIENT");
    b.field("Name", p.display_name());
    b.text("Maiden name", p.maiden.as_deref());
    b.text("Gender", p.gender.as_deref());
    b.field("Birth date", p.birth_date.map(|d| d.format("%Y-%m-%d")));
    let on = encounter.start.map(|s| s.date());
    b.field("Age at encounter", on.and_then(|d| p.age_at(d)));
    b.field("Death date", p.death_date.map(|d| d.format("%Y-%m-%d")));
    b.text("Marital status", p.marital.as_deref());
    b.text("Race", p.race.as_deref());
    b.text("Ethnicity", p.ethnicity.as_deref());
    b.text("Birthplace", p.birthplace.as_deref());

    let address: Vec<&str> = [&p.address, &p.city, &p.state, &p.zip]
        .into_iter()
        .filter_map(|part| part.as_deref())
        .filter(|part| !part.trim().is_empty())
        .collect();
    if !address.is_empty() {
        b.field("Address", Some(address.join(", ")));
    }
    b.text("County", p.county.as_deref());
    b.field("Healthcare expenses", money(p.healthcare_expenses));
    b.field("Healthcare coverage", money(p.healthcare_coverage));
    b.field("Income", money(p.income));
}

fn render_provider(b: &mut Block, p: &Provider) {
    b.heading("PROVIDER");
    b.text("Name", p.name.as_deref());
    b.text("Speciality", p.speciality.as_deref());
    b.text("Gender", p.gender.as_deref());
    b.text("City", p.city.as_deref());
}

fn render_organization(b: &mut Block, o: &Organization) {
    b.heading("ORGANIZATION");
    b.text("Name", o.name.as_deref());
    b.text("Address", o.address.as_deref());
    b.text("City", o.city.as_deref());
    b.text("State", o.state.as_deref());
    b.text("Phone", o.phone.as_deref());
}

fn render_payer(b: &mut Block, p: &Payer) {
    b.heading("PAYER");
    b.text("Name", p.name.as_deref());
    b.text("Ownership", p.ownership.as_deref());
}

fn observation_value(value: &ObservationValue, units: Option<&str>) -> String {
    let shown = match value {
        ObservationValue::Numeric(n) => n.to_string(),
        ObservationValue::Text(t) => show_text(t).to_string(),
    };
    match units {
        Some(u) if !u.trim().is_empty() => format!("{shown} {u}"),
        _ => shown,
    }
}

fn render_event(b: &mut Block, event: &ClinicalEvent) {
    let kind = event.kind();
    match event {
        ClinicalEvent::Condition(c) => {
            let label = coded(c.description.as_deref(), "SNOMED", c.code.as_deref());
            b.item(&headline(c.start.as_ref(), label, kind));
            b.detail("Resolved", c.stop.as_ref());
        }
        ClinicalEvent::Procedure(p) => {
            let label = coded(p.description.as_deref(), "SNOMED", p.code.as_deref());
            b.item(&headline(p.date.as_ref(), label, kind));
            b.detail(
                "Reason",
                coded(p.reason_description.as_deref(), "SNOMED", p.reason_code.as_deref()),
            );
            b.detail("Base cost", money(p.base_cost));
        }
        ClinicalEvent::Medication(m) => {
            let label = coded(m.description.as_deref(), "RxNorm", m.code.as_deref());
            b.item(&headline(m.start.as_ref(), label, kind));
            b.detail("Stopped", m.stop.as_ref());
            b.detail(
                "Reason",
                coded(m.reason_description.as_deref(), "SNOMED", m.reason_code.as_deref()),
            );
            b.detail("Dispenses", m.dispenses);
            b.detail("Base cost", money(m.base_cost));
            b.detail("Payer coverage", money(m.payer_coverage));
            b.detail("Total cost", money(m.total_cost));
        }
        ClinicalEvent::Observation(o) => {
            let mut label = coded(o.description.as_deref(), "LOINC", o.code.as_deref());
            if let Some(value) = &o.value {
                let shown = observation_value(value, o.units.as_deref());
                label = Some(match label {
                    Some(l) => format!("{l} = {shown}"),
                    None => shown,
                });
            }
            b.item(&headline(o.date.as_ref(), label, kind));
            b.detail_text("Category", o.category.as_deref());
        }
        ClinicalEvent::Immunization(i) => {
            let label = coded(i.description.as_deref(), "CVX", i.code.as_deref());
            b.item(&headline(i.date.as_ref(), label, kind));
            b.detail("Base cost", money(i.base_cost));
        }
        ClinicalEvent::Allergy(a) => {
            let system = a.system.as_deref().unwrap_or("code");
            let label = coded(a.description.as_deref(), system, a.code.as_deref());
            b.item(&headline(a.start.as_ref(), label, kind));
            b.detail_text("Type", a.allergy_type.as_deref());
            b.detail_text("Category", a.category.as_deref());
            b.detail("Resolved", a.stop.as_ref());
            for reaction in &a.reactions {
                let described = coded(reaction.description.as_deref(), "SNOMED", reaction.code.as_deref());
                let shown = match (described, reaction.severity.as_deref()) {
                    (Some(d), Some(s)) => Some(format!("{d}, severity {}", show_text(s))),
                    (Some(d), None) => Some(d),
                    (None, Some(s)) => Some(format!("severity {}", show_text(s))),
                    (None, None) => None,
                };
                b.detail("Reaction", shown);
            }
        }
        ClinicalEvent::CarePlan(c) => {
            let label = coded(c.description.as_deref(), "SNOMED", c.code.as_deref());
            b.item(&headline(c.start.as_ref(), label, kind));
            b.detail("Ended", c.stop.as_ref());
            b.detail(
                "Reason",
                coded(c.reason_description.as_deref(), "SNOMED", c.reason_code.as_deref()),
            );
        }
        ClinicalEvent::Device(d) => {
            let label = coded(d.description.as_deref(), "SNOMED", d.code.as_deref());
            b.item(&headline(d.start.as_ref(), label, kind));
            b.detail("Removed", d.stop.as_ref());
            b.detail_text("UDI", d.udi.as_deref());
        }
        ClinicalEvent::ImagingStudy(s) => {
            let label = coded(
                s.modality_description.as_deref(),
                "DICOM-DCM",
                s.modality_code.as_deref(),
            );
            b.item(&headline(s.date.as_ref(), label, kind));
            b.detail(
                "Body site",
                coded(s.body_site_description.as_deref(), "SNOMED", s.body_site_code.as_deref()),
            );
            b.detail(
                "SOP class",
                coded(s.sop_description.as_deref(), "DICOM-SOP", s.sop_code.as_deref()),
            );
        }
    }
}

/// Render the profile into its canonical text block.
pub fn render_profile(profile: &EncounterProfile) -> String {
    let mut b = Block::new();

    render_encounter(&mut b, profile.encounter(), profile.payer().is_some());
    render_patient(&mut b, profile.patient(), profile.encounter());
    if let Some(p) = profile.provider() {
        render_provider(&mut b, p);
    }
    if let Some(o) = profile.organization() {
        render_organization(&mut b, o);
    }
    if let Some(p) = profile.payer() {
        render_payer(&mut b, p);
    }

    for kind in EventKind::ALL {
        let events = profile.events(*kind);
        if events.is_empty() {
            continue;
        }
        b.heading(&format!("{} ({})", kind.section_title(), events.len()));
        for event in events {
            render_event(&mut b, event);
        }
    }

    b.out
}

/// SHA-256 of the rendered block, base64-encoded.
pub fn profile_digest(rendered: &str) -> String {
    let hash = Sha256::digest(rendered.as_bytes());
    base64::engine::general_purpose::STANDARD.encode(hash)
}
