//! Static catalog tables: test definitions, aliases, unit spellings, and
//! conversion factors.
//!
//! Values mirror the reference ranges and factors used by the originating
//! laboratory system; they are heuristic clinical defaults, not a validated
//! clinical source.

use super::ConversionFamily;

pub(super) struct TestSpec {
    pub name: &'static str,
    pub patterns: &'static [&'static str],
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub critical_low: Option<f64>,
    pub critical_high: Option<f64>,
    pub unit: &'static str,
    pub precision: u32,
    pub family: Option<ConversionFamily>,
}

pub(super) const TEST_SPECS: &[TestSpec] = &[
    TestSpec {
        name: "glucose_fasting",
        patterns: &[
            r"fasting\s+glucose[:\s]*(\d+(?:\.\d+)?)",
            r"glucose[,\s]*fasting[:\s]*(\d+(?:\.\d+)?)",
            r"FBG[:\s]*(\d+(?:\.\d+)?)",
            r"fasting\s+blood\s+glucose[:\s]*(\d+(?:\.\d+)?)",
        ],
        min: Some(70.0),
        max: Some(100.0),
        critical_low: None,
        critical_high: Some(126.0),
        unit: "mg/dL",
        precision: 0,
        family: Some(ConversionFamily::Glucose),
    },
    TestSpec {
        name: "glucose_random",
        patterns: &[
            r"random\s+glucose[:\s]*(\d+(?:\.\d+)?)",
            r"glucose[,\s]*random[:\s]*(\d+(?:\.\d+)?)",
            r"RBG[:\s]*(\d+(?:\.\d+)?)",
        ],
        min: Some(70.0),
        max: Some(140.0),
        critical_low: None,
        critical_high: Some(200.0),
        unit: "mg/dL",
        precision: 0,
        family: Some(ConversionFamily::Glucose),
    },
    TestSpec {
        name: "hba1c",
        patterns: &[
            r"hba1c[:\s]*(\d+(?:\.\d+)?)",
            r"hemoglobin\s+a1c[:\s]*(\d+(?:\.\d+)?)",
            r"glycated\s+hemoglobin[:\s]*(\d+(?:\.\d+)?)",
            r"a1c[:\s]*(\d+(?:\.\d+)?)",
        ],
        min: Some(4.0),
        max: Some(5.6),
        critical_low: None,
        critical_high: Some(7.0),
        unit: "%",
        precision: 1,
        family: None,
    },
    TestSpec {
        name: "cholesterol_total",
        patterns: &[
            r"total\s+cholesterol[:\s]*(\d+(?:\.\d+)?)",
            r"cholesterol[,\s]*total[:\s]*(\d+(?:\.\d+)?)",
            r"TC[:\s]*(\d+(?:\.\d+)?)",
            r"serum\s+cholesterol[:\s]*(\d+(?:\.\d+)?)",
        ],
        min: Some(0.0),
        max: Some(200.0),
        critical_low: None,
        critical_high: Some(240.0),
        unit: "mg/dL",
        precision: 0,
        family: Some(ConversionFamily::Cholesterol),
    },
    TestSpec {
        name: "cholesterol_hdl",
        patterns: &[
            r"hdl[:\s]*(\d+(?:\.\d+)?)",
            r"hdl\s+cholesterol[:\s]*(\d+(?:\.\d+)?)",
            r"high\s+density\s+lipoprotein[:\s]*(\d+(?:\.\d+)?)",
        ],
        min: Some(40.0),
        max: Some(100.0),
        critical_low: Some(40.0),
        critical_high: None,
        unit: "mg/dL",
        precision: 0,
        family: Some(ConversionFamily::Cholesterol),
    },
    TestSpec {
        name: "cholesterol_ldl",
        patterns: &[
            r"ldl[:\s]*(\d+(?:\.\d+)?)",
            r"ldl\s+cholesterol[:\s]*(\d+(?:\.\d+)?)",
            r"low\s+density\s+lipoprotein[:\s]*(\d+(?:\.\d+)?)",
        ],
        min: Some(0.0),
        max: Some(130.0),
        critical_low: None,
        critical_high: Some(160.0),
        unit: "mg/dL",
        precision: 0,
        family: Some(ConversionFamily::Cholesterol),
    },
    TestSpec {
        name: "triglycerides",
        patterns: &[
            r"triglycerides[:\s]*(\d+(?:\.\d+)?)",
            r"tg[:\s]*(\d+(?:\.\d+)?)",
            r"trigs[:\s]*(\d+(?:\.\d+)?)",
        ],
        min: Some(0.0),
        max: Some(150.0),
        critical_low: None,
        critical_high: Some(200.0),
        unit: "mg/dL",
        precision: 0,
        family: Some(ConversionFamily::Triglycerides),
    },
    TestSpec {
        name: "creatinine",
        patterns: &[
            r"creatinine[:\s]*(\d+(?:\.\d+)?)",
            r"serum\s+creatinine[:\s]*(\d+(?:\.\d+)?)",
            r"cr[:\s]*(\d+(?:\.\d+)?)",
        ],
        min: Some(0.6),
        max: Some(1.2),
        critical_low: None,
        critical_high: Some(2.0),
        unit: "mg/dL",
        precision: 2,
        family: Some(ConversionFamily::Creatinine),
    },
    TestSpec {
        name: "bun",
        patterns: &[
            r"bun[:\s]*(\d+(?:\.\d+)?)",
            r"blood\s+urea\s+nitrogen[:\s]*(\d+(?:\.\d+)?)",
            r"urea[:\s]*(\d+(?:\.\d+)?)",
        ],
        min: Some(7.0),
        max: Some(20.0),
        critical_low: None,
        critical_high: Some(50.0),
        unit: "mg/dL",
        precision: 0,
        family: Some(ConversionFamily::Urea),
    },
    TestSpec {
        name: "hemoglobin",
        patterns: &[
            r"hemoglobin[:\s]*(\d+(?:\.\d+)?)",
            r"hgb[:\s]*(\d+(?:\.\d+)?)",
            r"hb[:\s]*(\d+(?:\.\d+)?)",
        ],
        min: Some(12.0),
        max: Some(16.0),
        critical_low: Some(8.0),
        critical_high: None,
        unit: "g/dL",
        precision: 1,
        family: Some(ConversionFamily::Hemoglobin),
    },
    TestSpec {
        name: "hematocrit",
        patterns: &[
            r"hematocrit[:\s]*(\d+(?:\.\d+)?)",
            r"hct[:\s]*(\d+(?:\.\d+)?)",
            r"packed\s+cell\s+volume[:\s]*(\d+(?:\.\d+)?)",
        ],
        min: Some(36.0),
        max: Some(48.0),
        critical_low: Some(24.0),
        critical_high: None,
        unit: "%",
        precision: 1,
        family: None,
    },
    TestSpec {
        name: "white_blood_cells",
        patterns: &[
            r"wbc[:\s]*(\d+(?:\.\d+)?)",
            r"white\s+blood\s+cells[:\s]*(\d+(?:\.\d+)?)",
            r"leukocytes[:\s]*(\d+(?:\.\d+)?)",
        ],
        min: Some(4.0),
        max: Some(11.0),
        critical_low: None,
        critical_high: Some(20.0),
        unit: "K/μL",
        precision: 2,
        family: None,
    },
    TestSpec {
        name: "platelets",
        patterns: &[
            r"platelets[:\s]*(\d+(?:\.\d+)?)",
            r"plt[:\s]*(\d+(?:\.\d+)?)",
            r"thrombocytes[:\s]*(\d+(?:\.\d+)?)",
        ],
        min: Some(150.0),
        max: Some(450.0),
        critical_low: Some(50.0),
        critical_high: None,
        unit: "K/μL",
        precision: 2,
        family: None,
    },
    TestSpec {
        name: "tsh",
        patterns: &[
            r"tsh[:\s]*(\d+(?:\.\d+)?)",
            r"thyroid\s+stimulating\s+hormone[:\s]*(\d+(?:\.\d+)?)",
            r"thyrotropin[:\s]*(\d+(?:\.\d+)?)",
        ],
        min: Some(0.4),
        max: Some(4.0),
        critical_low: None,
        critical_high: Some(10.0),
        unit: "mIU/L",
        precision: 3,
        family: Some(ConversionFamily::Thyroid),
    },
    TestSpec {
        name: "t3",
        patterns: &[
            r"t3[:\s]*(\d+(?:\.\d+)?)",
            r"triiodothyronine[:\s]*(\d+(?:\.\d+)?)",
            r"free\s+t3[:\s]*(\d+(?:\.\d+)?)",
        ],
        min: Some(80.0),
        max: Some(200.0),
        critical_low: None,
        critical_high: Some(300.0),
        unit: "ng/dL",
        precision: 0,
        family: Some(ConversionFamily::Thyroid),
    },
    TestSpec {
        name: "t4",
        patterns: &[
            r"t4[:\s]*(\d+(?:\.\d+)?)",
            r"thyroxine[:\s]*(\d+(?:\.\d+)?)",
            r"free\s+t4[:\s]*(\d+(?:\.\d+)?)",
        ],
        min: Some(5.0),
        max: Some(12.0),
        critical_low: None,
        critical_high: Some(20.0),
        unit: "μg/dL",
        precision: 1,
        family: Some(ConversionFamily::Thyroid),
    },
    TestSpec {
        name: "alt",
        patterns: &[
            r"alt[:\s]*(\d+(?:\.\d+)?)",
            r"alanine\s+aminotransferase[:\s]*(\d+(?:\.\d+)?)",
            r"alat[:\s]*(\d+(?:\.\d+)?)",
        ],
        min: Some(7.0),
        max: Some(40.0),
        critical_low: None,
        critical_high: Some(120.0),
        unit: "U/L",
        precision: 0,
        family: None,
    },
    TestSpec {
        name: "ast",
        patterns: &[
            r"ast[:\s]*(\d+(?:\.\d+)?)",
            r"aspartate\s+aminotransferase[:\s]*(\d+(?:\.\d+)?)",
            r"asat[:\s]*(\d+(?:\.\d+)?)",
        ],
        min: Some(8.0),
        max: Some(40.0),
        critical_low: None,
        critical_high: Some(120.0),
        unit: "U/L",
        precision: 0,
        family: None,
    },
    TestSpec {
        name: "bilirubin_total",
        patterns: &[
            r"total\s+bilirubin[:\s]*(\d+(?:\.\d+)?)",
            r"bilirubin[,\s]*total[:\s]*(\d+(?:\.\d+)?)",
            r"tbil[:\s]*(\d+(?:\.\d+)?)",
        ],
        min: Some(0.2),
        max: Some(1.2),
        critical_low: None,
        critical_high: Some(3.0),
        unit: "mg/dL",
        precision: 1,
        family: Some(ConversionFamily::Bilirubin),
    },
    TestSpec {
        name: "albumin",
        patterns: &[
            r"albumin[:\s]*(\d+(?:\.\d+)?)",
            r"serum\s+albumin[:\s]*(\d+(?:\.\d+)?)",
            r"alb[:\s]*(\d+(?:\.\d+)?)",
        ],
        min: Some(3.5),
        max: Some(5.0),
        critical_low: Some(2.5),
        critical_high: None,
        unit: "g/dL",
        precision: 1,
        family: Some(ConversionFamily::Protein),
    },
];

/// Direct alias → canonical test name, checked before substring fallback.
pub(super) const DIRECT_ALIASES: &[(&str, &str)] = &[
    ("fbs", "glucose_fasting"),
    ("fasting blood sugar", "glucose_fasting"),
    ("fasting glucose", "glucose_fasting"),
    ("rbs", "glucose_random"),
    ("random blood sugar", "glucose_random"),
    ("hba1c", "hba1c"),
    ("hemoglobin a1c", "hba1c"),
    ("glycated hemoglobin", "hba1c"),
    ("total cholesterol", "cholesterol_total"),
    ("hdl cholesterol", "cholesterol_hdl"),
    ("hdl-c", "cholesterol_hdl"),
    ("ldl cholesterol", "cholesterol_ldl"),
    ("ldl-c", "cholesterol_ldl"),
    ("serum creatinine", "creatinine"),
    ("blood urea nitrogen", "bun"),
    ("hemoglobin", "hemoglobin"),
    ("hematocrit", "hematocrit"),
    ("white blood cells", "white_blood_cells"),
    ("platelets", "platelets"),
    ("thyroid stimulating hormone", "tsh"),
    ("triiodothyronine", "t3"),
    ("thyroxine", "t4"),
    ("alanine aminotransferase", "alt"),
    ("aspartate aminotransferase", "ast"),
    ("total bilirubin", "bilirubin_total"),
    ("albumin", "albumin"),
];

/// Abbreviation expansions applied during text normalization.
pub(super) const ABBREVIATIONS: &[(&str, &str)] = &[
    (r"\bFBS\b", "fasting glucose"),
    (r"\bRBS\b", "random glucose"),
    (r"\bTC\b", "total cholesterol"),
    (r"\bHDL-C\b", "HDL cholesterol"),
    (r"\bLDL-C\b", "LDL cholesterol"),
    (r"\bSCr\b", "serum creatinine"),
    (r"\bTBIL\b", "total bilirubin"),
];

/// Context patterns for detecting a unit near a matched value.
///
/// Checked in order; the first canonical unit whose pattern matches wins, so
/// more specific spellings (`mg/dl`) must precede spellings they contain
/// (`g/dl`).
pub(super) const UNIT_DETECTORS: &[(&str, &[&str])] = &[
    ("mg/dL", &[r"mg/dl", r"mg\s*/\s*dl", r"milligrams per deciliter"]),
    ("g/dL", &[r"g/dl", r"g\s*/\s*dl", r"grams per deciliter"]),
    ("μg/dL", &[r"μg/dl", r"ug/dl", r"mcg/dl", r"micrograms per deciliter"]),
    ("ng/dL", &[r"ng/dl", r"nanograms per deciliter"]),
    ("mIU/L", &[r"miu/l", r"milli international units per liter"]),
    ("U/L", &[r"u/l", r"units per liter", r"iu/l"]),
    ("K/μL", &[r"k/μl", r"k/ul", r"thousands per microliter"]),
    ("%", &[r"percent", r"percentage"]),
    ("mmol/L", &[r"mmol/l", r"millimoles per liter"]),
    ("cells/μL", &[r"cells/μl", r"cells/ul", r"cells per microliter"]),
];

/// Spelling variants → canonical unit string.
///
/// Keys are case-folded with spaces stripped before lookup.
pub(super) const UNIT_SPELLINGS: &[(&str, &str)] = &[
    ("mg/dl", "mg/dL"),
    ("mgdl", "mg/dL"),
    ("mg%", "mg/dL"),
    ("g/dl", "g/dL"),
    ("gdl", "g/dL"),
    ("g%", "g/dL"),
    ("ug/dl", "μg/dL"),
    ("ugdl", "μg/dL"),
    ("mcg/dl", "μg/dL"),
    ("μg/dl", "μg/dL"),
    ("ng/dl", "ng/dL"),
    ("ngdl", "ng/dL"),
    ("mmol/l", "mmol/L"),
    ("mmoll", "mmol/L"),
    ("umol/l", "μmol/L"),
    ("umoll", "μmol/L"),
    ("μmol/l", "μmol/L"),
    ("nmol/l", "nmol/L"),
    ("nmoll", "nmol/L"),
    ("pmol/l", "pmol/L"),
    ("pmoll", "pmol/L"),
    ("miu/l", "mIU/L"),
    ("miul", "mIU/L"),
    ("u/l", "U/L"),
    ("ul", "U/L"),
    ("iu/l", "U/L"),
    ("iul", "U/L"),
    ("k/ul", "K/μL"),
    ("k/μl", "K/μL"),
    ("thousand/ul", "K/μL"),
    ("thousand/μl", "K/μL"),
    ("percent", "%"),
    ("percentage", "%"),
    ("ng/ml", "ng/mL"),
    ("ngml", "ng/mL"),
    ("pg/ml", "pg/mL"),
    ("pgml", "pg/mL"),
];

/// Multiplicative conversion factors (family, from, to, factor).
///
/// Units are canonical spellings; lookups normalize first. Identity entries
/// are generated at load time.
pub(super) const FACTORS: &[(ConversionFamily, &str, &str, f64)] = &[
    (ConversionFamily::Glucose, "mg/dL", "mmol/L", 0.0555),
    (ConversionFamily::Glucose, "mmol/L", "mg/dL", 18.018),
    (ConversionFamily::Cholesterol, "mg/dL", "mmol/L", 0.0259),
    (ConversionFamily::Cholesterol, "mmol/L", "mg/dL", 38.67),
    (ConversionFamily::Triglycerides, "mg/dL", "mmol/L", 0.0113),
    (ConversionFamily::Triglycerides, "mmol/L", "mg/dL", 88.5),
    (ConversionFamily::Creatinine, "mg/dL", "μmol/L", 88.4),
    (ConversionFamily::Creatinine, "μmol/L", "mg/dL", 0.0113),
    (ConversionFamily::Urea, "mg/dL", "mmol/L", 0.357),
    (ConversionFamily::Urea, "mmol/L", "mg/dL", 2.8),
    (ConversionFamily::Bilirubin, "mg/dL", "μmol/L", 17.1),
    (ConversionFamily::Bilirubin, "μmol/L", "mg/dL", 0.0585),
    (ConversionFamily::Protein, "g/dL", "g/L", 10.0),
    (ConversionFamily::Protein, "g/L", "g/dL", 0.1),
    (ConversionFamily::Hemoglobin, "g/dL", "g/L", 10.0),
    (ConversionFamily::Hemoglobin, "g/dL", "mmol/L", 0.6206),
    (ConversionFamily::Hemoglobin, "g/L", "g/dL", 0.1),
    (ConversionFamily::Hemoglobin, "g/L", "mmol/L", 0.06206),
    (ConversionFamily::Hemoglobin, "mmol/L", "g/dL", 1.611),
    (ConversionFamily::Hemoglobin, "mmol/L", "g/L", 16.11),
    (ConversionFamily::Thyroid, "ng/dL", "nmol/L", 0.01281),
    (ConversionFamily::Thyroid, "ng/dL", "ng/mL", 0.01),
    (ConversionFamily::Thyroid, "nmol/L", "ng/dL", 78.1),
    (ConversionFamily::Thyroid, "ng/mL", "ng/dL", 100.0),
    (ConversionFamily::Thyroid, "μg/dL", "pmol/L", 12.87),
    (ConversionFamily::Thyroid, "pmol/L", "μg/dL", 0.0777),
    (ConversionFamily::VitaminD, "ng/mL", "nmol/L", 2.5),
    (ConversionFamily::VitaminD, "nmol/L", "ng/mL", 0.4),
    (ConversionFamily::B12, "pg/mL", "pmol/L", 0.738),
    (ConversionFamily::B12, "pmol/L", "pg/mL", 1.355),
];
