/// The fixed set of nine canonical IEP section titles, in the order they
/// should be presented, with the extraction guidance text the Structured
/// Extractor's `get_section_info` tool returns. Ported from the original
/// implementation's `config.py` section-guidance table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanonicalSection {
    pub title: &'static str,
    pub description: &'static str,
    pub guidance: &'static str,
}

pub const CANONICAL_SECTIONS: &[CanonicalSection] = &[
    CanonicalSection {
        title: "Present Levels",
        description: "The child's current academic and functional performance.",
        guidance: "Summarize present levels of academic achievement and functional performance (PLAAFP/PLOP). Include strengths, needs, and how the disability affects involvement in the general curriculum.",
    },
    CanonicalSection {
        title: "Eligibility",
        description: "The disability category and eligibility determination.",
        guidance: "State the disability category under which the child qualifies and the evaluation basis for eligibility.",
    },
    CanonicalSection {
        title: "Placement",
        description: "The educational setting and amount of time in general education.",
        guidance: "Describe the placement decision, the least restrictive environment (LRE) justification, and the percentage of time spent with non-disabled peers.",
    },
    CanonicalSection {
        title: "Goals",
        description: "Annual measurable goals and short-term objectives.",
        guidance: "List each annual goal with its baseline, measurable target, and the method/schedule used to measure progress.",
    },
    CanonicalSection {
        title: "Services",
        description: "Special education and related services, frequency, and duration.",
        guidance: "Enumerate each service (e.g., speech therapy, occupational therapy), its frequency, duration, location, and start/end dates.",
    },
    CanonicalSection {
        title: "Informed Consent",
        description: "Parental consent and procedural safeguards notices.",
        guidance: "Note whether parental consent was obtained, for what, and whether procedural safeguards were provided.",
    },
    CanonicalSection {
        title: "Accommodations",
        description: "Classroom and testing accommodations or modifications.",
        guidance: "List accommodations and modifications for instruction and assessment (e.g., extended time, preferential seating).",
    },
    CanonicalSection {
        title: "Key People",
        description: "IEP team members and their roles.",
        guidance: "List the IEP team members present (or invited) and their roles (e.g., special education teacher, parent, school psychologist).",
    },
    CanonicalSection {
        title: "Strengths",
        description: "The child's strengths, interests, and preferences.",
        guidance: "Summarize the child's strengths, interests, and preferences as noted by the team and family.",
    },
];

/// The placeholder sentence used when a required section is absent from the
/// extractor's output (I3). Both the extractor and a post-validator may
/// insert this.
pub const MISSING_SECTION_PLACEHOLDER: &str =
    "This section was not found in the scanned document and may need to be requested from the school.";

pub fn section_titles() -> Vec<&'static str> {
    CANONICAL_SECTIONS.iter().map(|s| s.title).collect()
}

pub fn find_section(title: &str) -> Option<&'static CanonicalSection> {
    CANONICAL_SECTIONS.iter().find(|s| s.title.eq_ignore_ascii_case(title))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn has_exactly_nine_sections() {
        assert_eq!(CANONICAL_SECTIONS.len(), 9);
    }

    #[test]
    fn find_section_is_case_insensitive() {
        assert!(find_section("present levels").is_some());
        assert!(find_section("PRESENT LEVELS").is_some());
        assert!(find_section("not a real section").is_none());
    }

    #[test]
    fn titles_are_unique() {
        let titles = section_titles();
        let mut sorted = titles.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(titles.len(), sorted.len());
    }
}
