use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::types::SummaryField;

/// How a match turns into the value stored on the summary.
pub(crate) enum Canonical {
    /// Always the same normalized term.
    Fixed(&'static str),
    /// The `term` group (or the whole match), lowercased and trimmed.
    Captured,
    /// One value per body part in the `body` group, combined with the
    /// symptom noun in the `noun` group ("pain" when absent).
    BodyParts,
    /// `title` + `name` groups, rendered as `Ms. Jones`.
    Honorific,
}

/// A compiled vocabulary pattern and how to normalize what it matches.
pub(crate) struct TermPattern {
    pub regex: Regex,
    pub canonical: Canonical,
}

impl TermPattern {
    /// Normalized values for one match. Body-part lists yield one value per part.
    pub fn normalize(&self, caps: &Captures<'_>) -> Vec<String> {
        match &self.canonical {
            Canonical::Fixed(term) => vec![term.to_string()],
            Canonical::Captured => caps
                .name("term")
                .or_else(|| caps.get(0))
                .map(|m| clean_phrase(m.as_str()))
                .filter(|p| !p.is_empty())
                .into_iter()
                .collect(),
            Canonical::BodyParts => {
                let noun = symptom_noun(caps.name("noun").map(|m| m.as_str()));
                caps.name("body")
                    .map(|m| split_body_list(m.as_str()))
                    .unwrap_or_default()
                    .iter()
                    .map(|part| body_symptom(&normalize_body_part(part), noun))
                    .collect()
            }
            Canonical::Honorific => match (caps.name("title"), caps.name("name")) {
                (Some(title), Some(name)) => {
                    let title = title.as_str().trim_end_matches('.');
                    if title == "Miss" {
                        vec![format!("Miss {}", name.as_str())]
                    } else {
                        vec![format!("{title}. {}", name.as_str())]
                    }
                }
                _ => Vec::new(),
            },
        }
    }
}

fn term(regex_str: &str, canonical: Canonical) -> TermPattern {
    TermPattern {
        regex: Regex::new(regex_str).expect("Invalid vocabulary regex pattern"),
        canonical,
    }
}

/// Same as [`term`], with `BODYLIST` expanded to a list of body parts.
fn body_term(template: &str, canonical: Canonical) -> TermPattern {
    term(&template.replace("BODYLIST", &BODY_LIST), canonical)
}

const BODY_PART: &str = r"(?:(?:left|right|lower|upper)\s+)?(?:head|neck|back|shoulders?|knees?|hips?|ankles?|wrists?|elbows?|arms?|legs?|feet|foot|hands?|fingers?|toes?|chest|stomach|abdomen|tummy|belly|throat|ears?|teeth|tooth|jaw|joints?|spine|muscles?)";

/// "neck and back", "knees, hips & ankles".
static BODY_LIST: LazyLock<String> = LazyLock::new(|| {
    format!(r"{BODY_PART}(?:(?:\s*,\s*(?:and\s+)?|\s+and\s+|\s*&\s*){BODY_PART})*")
});

/// Symptom patterns in priority order. Earlier patterns claim their text;
/// later patterns skip anything that overlaps.
pub(crate) static SYMPTOM_PATTERNS: LazyLock<Vec<TermPattern>> = LazyLock::new(|| {
    vec![
        body_term(
            r"(?i)\b(?P<noun>pain|aches?|aching|soreness|stiffness|swelling|discomfort)\s+in\s+(?:my|the|his|her|your|both)\s+(?P<body>BODYLIST)\b",
            Canonical::BodyParts,
        ),
        body_term(
            r"(?i)\b(?P<body>BODYLIST)\s+(?P<noun>pain|aches?|soreness|stiffness|swelling)\b",
            Canonical::BodyParts,
        ),
        term(
            r"(?i)\b(?P<body>back|stomach|tummy|belly|ear|tooth)aches?\b",
            Canonical::BodyParts,
        ),
        body_term(
            r"(?i)\b(?P<noun>sore|painful|aching|stiff|swollen|tender)\s+(?P<body>BODYLIST)\b",
            Canonical::BodyParts,
        ),
        body_term(
            r"(?i)\bmy\s+(?P<body>BODYLIST)\s+(?:hurts?|hurting|aches?|aching|(?:is|are)\s+(?:sore|painful|killing\s+me))\b",
            Canonical::BodyParts,
        ),
        term(r"(?i)\bhit\s+(?:my|his|her|their)\s+head\b", Canonical::Fixed("head impact")),
        term(r"(?i)\bheadaches?\b", Canonical::Fixed("headache")),
        term(r"(?i)\bmigraines?\b", Canonical::Fixed("migraine")),
        term(r"(?i)\bdizz(?:y|iness)\b|\blight-?headed(?:ness)?\b", Canonical::Fixed("dizziness")),
        term(r"(?i)\bnause(?:a|ous|ated)\b", Canonical::Fixed("nausea")),
        term(r"(?i)\bvomit(?:ing|ed)?\b|\bthrowing\s+up\b", Canonical::Fixed("vomiting")),
        term(r"(?i)\bfevers?\b|\bhigh\s+temperature\b", Canonical::Fixed("fever")),
        term(r"(?i)\bcough(?:s|ing)?\b", Canonical::Fixed("cough")),
        term(r"(?i)\bfatigue\b|\btiredness\b|\bexhausted\b", Canonical::Fixed("fatigue")),
        term(
            r"(?i)\bshort(?:ness)?\s+of\s+breath\b|\bbreathless(?:ness)?\b",
            Canonical::Fixed("shortness of breath"),
        ),
        term(r"(?i)\bswelling\b|\bswollen\b", Canonical::Fixed("swelling")),
        term(r"(?i)\bnumb(?:ness)?\b", Canonical::Fixed("numbness")),
        term(r"(?i)\btingl(?:ing|y|es)\b|\bpins\s+and\s+needles\b", Canonical::Fixed("tingling")),
        term(
            r"(?i)\b(?:trouble|difficulty|problems?)\s+sleeping\b|\binsomnia\b|\bcan't\s+sleep\b",
            Canonical::Fixed("sleep disturbance"),
        ),
        term(r"(?i)\brash(?:es)?\b", Canonical::Fixed("rash")),
        term(r"(?i)\bdiscomfort\b", Canonical::Fixed("discomfort")),
        term(r"(?i)\bstiff(?:ness)?\b", Canonical::Fixed("stiffness")),
        term(r"(?i)\btender(?:ness)?\b", Canonical::Fixed("tenderness")),
        term(r"(?i)\bchills\b", Canonical::Fixed("chills")),
        term(r"(?i)\bdiarrh(?:o)?ea\b", Canonical::Fixed("diarrhea")),
        term(r"(?i)\bconstipat(?:ion|ed)\b", Canonical::Fixed("constipation")),
        term(r"(?i)\bwheez(?:e|ing|y)\b", Canonical::Fixed("wheezing")),
        term(r"(?i)\bpalpitations?\b", Canonical::Fixed("palpitations")),
        term(r"(?i)\bblurr?(?:ed|y)\s+vision\b", Canonical::Fixed("blurred vision")),
        // Unlocated pain. Dropped from the summary when a located pain exists.
        term(r"(?i)\b(?:pain|aches?|aching|hurts?|hurting)\b", Canonical::Fixed(GENERIC_PAIN)),
    ]
});

pub(crate) const GENERIC_PAIN: &str = "pain";

pub(crate) static DIAGNOSIS_PATTERNS: LazyLock<Vec<TermPattern>> = LazyLock::new(|| {
    vec![
        term(r"(?i)\bwhiplash(?:\s+injury)?\b", Canonical::Fixed("whiplash injury")),
        term(r"(?i)\bconcussion\b", Canonical::Fixed("concussion")),
        term(r"(?i)\bsprain(?:s|ed)?\b", Canonical::Fixed("sprain")),
        term(
            r"(?i)\bmuscle\s+strain\b|\bstrained\s+(?:a\s+|my\s+|your\s+)?muscle\b|\bpulled\s+(?:a\s+)?muscle\b",
            Canonical::Fixed("muscle strain"),
        ),
        term(
            r"(?i)\bfractur(?:e|es|ed)\b|\bbroken\s+(?:bone|arm|leg|wrist|ankle|rib|finger|toe)s?\b",
            Canonical::Fixed("fracture"),
        ),
        term(r"(?i)\bjumper's\s+knee\b|\btend[io]nitis\b", Canonical::Fixed("tendinitis")),
        term(r"(?i)\brheumatoid\s+arthritis\b", Canonical::Fixed("rheumatoid arthritis")),
        term(r"(?i)\bosteoarthritis\b", Canonical::Fixed("osteoarthritis")),
        term(r"(?i)\barthritis\b", Canonical::Fixed("arthritis")),
        term(r"(?i)\bbursitis\b", Canonical::Fixed("bursitis")),
        term(r"(?i)\btorn\s+meniscus\b|\bmeniscus\s+tear\b", Canonical::Fixed("meniscus tear")),
        term(r"(?i)\btorn\s+ligament\b|\bligament\s+tear\b", Canonical::Fixed("ligament tear")),
        term(r"(?i)\bsciatica\b", Canonical::Fixed("sciatica")),
        term(r"(?i)\b(?:herniated|slipped|bulging)\s+dis[ck]\b", Canonical::Fixed("herniated disc")),
        term(r"(?i)\bhypertension\b|\bhigh\s+blood\s+pressure\b", Canonical::Fixed("hypertension")),
        term(r"(?i)\bdiabetes\b", Canonical::Fixed("diabetes")),
        term(r"(?i)\basthma\b", Canonical::Fixed("asthma")),
        term(r"(?i)\bbronchitis\b", Canonical::Fixed("bronchitis")),
        term(r"(?i)\bpneumonia\b", Canonical::Fixed("pneumonia")),
        term(r"(?i)\binfluenza\b|\bthe\s+flu\b", Canonical::Fixed("influenza")),
        term(r"(?i)\bcommon\s+cold\b", Canonical::Fixed("common cold")),
        term(
            r"(?i)\burinary\s+tract\s+infection\b|\bUTI\b",
            Canonical::Fixed("urinary tract infection"),
        ),
        term(r"(?i)\bsinusitis\b", Canonical::Fixed("sinusitis")),
        term(r"(?i)\bgastritis\b", Canonical::Fixed("gastritis")),
        term(r"(?i)\ban(?:a)?emi(?:a|c)\b", Canonical::Fixed("anemia")),
        term(r"(?i)\bgout\b", Canonical::Fixed("gout")),
        term(r"(?i)\bplantar\s+fasciitis\b", Canonical::Fixed("plantar fasciitis")),
        term(r"(?i)\bcarpal\s+tunnel(?:\s+syndrome)?\b", Canonical::Fixed("carpal tunnel syndrome")),
        // Diagnostic phrasing around a condition the list above does not know.
        term(
            r"(?i)\b(?:diagnosed\s+(?:it\s+as|with)|consistent\s+with|diagnosis\s+(?:is|was)|said\s+it\s+was|you\s+have)\s+(?:an?\s+|the\s+)?(?P<term>(?:[a-z]+\s+){0,2}[a-z]*(?:itis|osis|injury|sprain|strain|fracture|tear|syndrome|disease|infection|disorder))\b",
            Canonical::Captured,
        ),
    ]
});

pub(crate) static TREATMENT_PATTERNS: LazyLock<Vec<TermPattern>> = LazyLock::new(|| {
    vec![
        term(r"(?i)\bibuprofen\b|\badvil\b|\bmotrin\b|\bnurofen\b", Canonical::Fixed("ibuprofen")),
        term(
            r"(?i)\bacetaminophen\b|\bparacetamol\b|\btylenol\b",
            Canonical::Fixed("acetaminophen"),
        ),
        term(r"(?i)\bnaproxen\b|\baleve\b", Canonical::Fixed("naproxen")),
        term(r"(?i)\baspirin\b", Canonical::Fixed("aspirin")),
        term(r"(?i)\bcodeine\b", Canonical::Fixed("codeine")),
        term(r"(?i)\btramadol\b", Canonical::Fixed("tramadol")),
        term(r"(?i)\bdiclofenac\b|\bvoltaren\b", Canonical::Fixed("diclofenac")),
        term(r"(?i)\bamoxicillin\b", Canonical::Fixed("amoxicillin")),
        term(r"(?i)\bantibiotics?\b", Canonical::Fixed("antibiotics")),
        term(
            r"(?i)\bpain\s*killers?\b|\bpain\s+relievers?\b|\bpain\s+(?:medication|medicine|relief)\b|\banalgesics?\b",
            Canonical::Fixed("painkillers"),
        ),
        term(
            r"(?i)\banti-?inflammator(?:y|ies)\b|\bNSAIDs?\b",
            Canonical::Fixed("anti-inflammatories"),
        ),
        term(r"(?i)\bmuscle\s+relaxants?\b", Canonical::Fixed("muscle relaxants")),
        term(
            r"(?i)\bphysiotherapy\b|\bphysical\s+therapy\b|\bphysio\b",
            Canonical::Fixed("physiotherapy"),
        ),
        term(r"(?i)\bice\s+packs?\b|\bicing\b|\bapply(?:ing)?\s+ice\b", Canonical::Fixed("ice")),
        term(
            r"(?i)\bbed\s+rest\b|\bplenty\s+of\s+rest\b|\bget\s+(?:some\s+)?rest\b|\brest\s+(?:it|the\s+\w+)\b",
            Canonical::Fixed("rest"),
        ),
        term(r"(?i)\bbrace\b", Canonical::Fixed("brace")),
        term(r"(?i)\bsplint\b", Canonical::Fixed("splint")),
        term(r"(?i)\bcrutches\b", Canonical::Fixed("crutches")),
        term(r"(?i)\bsling\b", Canonical::Fixed("sling")),
        term(r"(?i)\bsurgery\b|\bsurgical\s+repair\b", Canonical::Fixed("surgery")),
        term(
            r"(?i)\b(?:steroid|cortisone|corticosteroid)\s+(?:injection|shot)s?\b",
            Canonical::Fixed("steroid injection"),
        ),
        term(
            r"(?i)\b(?:exercise|stretching|strengthening)\s+(?:program(?:me)?|routine|plan)\b|\bhome\s+exercises\b",
            Canonical::Fixed("exercise program"),
        ),
        term(r"(?i)\bheat\s+(?:pack|therapy|pad)s?\b|\bheating\s+pad\b", Canonical::Fixed("heat therapy")),
        term(r"(?i)\binsulin\b", Canonical::Fixed("insulin")),
        term(r"(?i)\bmetformin\b", Canonical::Fixed("metformin")),
        term(r"(?i)\binhaler\b", Canonical::Fixed("inhaler")),
    ]
});

pub(crate) static PROGNOSIS_PATTERNS: LazyLock<Vec<TermPattern>> = LazyLock::new(|| {
    vec![
        term(
            r"(?i)\b(?P<term>(?:full|complete)\s+recovery(?:\s+(?:within|in)\s+(?:a\s+few|a\s+couple\s+of|[a-z0-9-]+)\s+(?:days?|weeks?|months?|years?))?)",
            Canonical::Captured,
        ),
        term(
            r"(?i)\b(?:do\s+not|don't)\s+(?:foresee|expect|anticipate)\s+any\s+(?:long[- ]term|lasting|permanent)\s+(?:damage|impact|effects?|problems?)\b",
            Canonical::Fixed("no long-term impact expected"),
        ),
        term(
            r"(?i)\bno\s+(?:signs?\s+of\s+)?(?:long[- ]term|lasting|permanent)\s+(?:damage|impact|effects?|problems?)\b",
            Canonical::Captured,
        ),
        term(
            r"(?i)\b(?:should|will|expect\s+(?:it|this|things)\s+to)\s+(?:continue\s+to\s+)?(?:improve|resolve|heal|settle|get\s+better)(?:\s+(?:within|in|over)\s+(?:a\s+few|a\s+couple\s+of|the\s+next|[a-z0-9-]+)\s+(?:days?|weeks?|months?|years?))?",
            Canonical::Captured,
        ),
        term(
            r"(?i)\bprognosis\s+is\s+(?P<term>[a-z][a-z -]{2,40}?)(?:[.,;!]|$)",
            Canonical::Captured,
        ),
    ]
});

/// Ongoing-symptom statements. Only patient turns are scanned.
pub(crate) static CURRENT_STATUS_PATTERNS: LazyLock<Vec<TermPattern>> = LazyLock::new(|| {
    vec![
        term(
            r"(?i)\bI\s+(?:do\s+)?(?:still\s+)?get\s+(?P<term>(?:occasional|some|the\s+odd|frequent)\s+[a-z][a-z -]*?)(?:[.,;!?]|\s+(?:but|though)\b|$)",
            Canonical::Captured,
        ),
        term(
            r"(?i)\b(?:still|currently)\s+(?:have|get|feel|experience|having|getting|experiencing)\s+(?P<term>[a-z][a-z -]*?)(?:[.,;!?]|\s+(?:but|though)\b|$)",
            Canonical::Captured,
        ),
    ]
});

/// Honorific + surname. Case-sensitive so ordinary words are not taken for names.
pub(crate) static PATIENT_NAME_PATTERNS: LazyLock<Vec<TermPattern>> = LazyLock::new(|| {
    vec![term(
        r"\b(?P<title>Mrs|Mr|Ms|Miss|Mx)\.?\s+(?P<name>[A-Z][a-z]+(?:[-'][A-Z][a-z]+)?)\b",
        Canonical::Honorific,
    )]
});

pub(crate) fn patterns_for(field: SummaryField) -> &'static [TermPattern] {
    match field {
        SummaryField::PatientName => &PATIENT_NAME_PATTERNS,
        SummaryField::Symptoms => &SYMPTOM_PATTERNS,
        SummaryField::Diagnosis => &DIAGNOSIS_PATTERNS,
        SummaryField::Treatments => &TREATMENT_PATTERNS,
        SummaryField::Prognosis => &PROGNOSIS_PATTERNS,
        SummaryField::CurrentStatus => &CURRENT_STATUS_PATTERNS,
    }
}

/// Every treatment term mentioned anywhere in `text`, negated or not.
pub fn treatment_terms(text: &str) -> BTreeSet<String> {
    let mut found = BTreeSet::new();
    for tp in TREATMENT_PATTERNS.iter() {
        for caps in tp.regex.captures_iter(text) {
            found.extend(tp.normalize(&caps));
        }
    }
    found
}

fn clean_phrase(raw: &str) -> String {
    let collapsed = raw
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    let trimmed = collapsed.trim_end_matches(|c: char| c.is_ascii_punctuation());
    ["a ", "an ", "the "]
        .iter()
        .find_map(|article| trimmed.strip_prefix(article))
        .unwrap_or(trimmed)
        .trim()
        .to_string()
}

fn split_body_list(list: &str) -> Vec<String> {
    let collapsed = list
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    collapsed
        .split([',', '&'])
        .flat_map(|chunk| chunk.split(" and "))
        .map(|part| part.trim().trim_start_matches("and ").trim().to_string())
        .filter(|part| !part.is_empty())
        .collect()
}

/// Singularize and map lay synonyms: "knees" -> "knee", "tummy" -> "stomach".
fn normalize_body_part(part: &str) -> String {
    let (qualifier, noun) = match part.rsplit_once(' ') {
        Some((q, n)) => (Some(q), n),
        None => (None, part),
    };
    let noun = match noun {
        "feet" => "foot",
        "teeth" => "tooth",
        "tummy" | "belly" => "stomach",
        other => other.strip_suffix('s').unwrap_or(other),
    };
    match qualifier {
        Some(q) => format!("{q} {noun}"),
        None => noun.to_string(),
    }
}

fn symptom_noun(word: Option<&str>) -> &'static str {
    match word.map(str::to_lowercase).as_deref() {
        Some("stiffness" | "stiff") => "stiffness",
        Some("swelling" | "swollen") => "swelling",
        Some("tender") => "tenderness",
        Some("discomfort") => "discomfort",
        _ => "pain",
    }
}

fn body_symptom(part: &str, noun: &str) -> String {
    match (part, noun) {
        ("head", "pain") => "headache".to_string(),
        ("throat", "pain") => "sore throat".to_string(),
        ("abdomen", "pain") => "abdominal pain".to_string(),
        _ => format!("{part} {noun}"),
    }
}
