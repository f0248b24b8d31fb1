use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::AidError;

/// Macro to generate enum with as_str + FromStr + serde-by-wire-value.
/// Wire values match the persisted snapshot format, so serde goes through
/// as_str / from_str rather than variant names.
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$(Self::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = AidError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(AidError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(D::Error::custom)
            }
        }
    };
}

pub(crate) use str_enum;

str_enum!(Treatment {
    Allopurinol => "ALLOPURINOL",
    Celecoxib => "CELECOXIB",
    Colchicine => "COLCHICINE",
    Diclofenac => "DICLOFENAC",
    Febuxostat => "FEBUXOSTAT",
    Ibuprofen => "IBUPROFEN",
    Indomethacin => "INDOMETHACIN",
    Meloxicam => "MELOXICAM",
    Methylprednisolone => "METHYLPREDNISOLONE",
    Naproxen => "NAPROXEN",
    Prednisone => "PREDNISONE",
    Probenecid => "PROBENECID",
});

str_enum!(DrugClass {
    Ult => "ULT",
    Steroid => "STEROID",
    Antiinflammatory => "ANTIINFLAMMATORY",
    Nsaid => "NSAID",
});

str_enum!(TrtType {
    Ult => "ULT",
    Flare => "FLARE",
    Ppx => "PPX",
});

str_enum!(Freq {
    Bid => "BID",
    Biw => "BIW",
    Once => "ONCE",
    Qday => "QDAY",
    Qid => "QID",
    Qotherday => "QOTHERDAY",
    Qweek => "QWEEK",
    Tid => "TID",
    Tiw => "TIW",
});

str_enum!(Contraindication {
    Absolute => "ABSOLUTE",
    Relative => "RELATIVE",
    DoseAdj => "DOSEADJ",
});

str_enum!(MedHistoryType {
    AllopurinolHypersensitivity => "ALLOPURINOLHYPERSENSITIVITY",
    Angina => "ANGINA",
    Anticoagulation => "ANTICOAGULATION",
    Bleed => "BLEED",
    Cad => "CAD",
    Chf => "CHF",
    Ckd => "CKD",
    ColchicineInteraction => "COLCHICINEINTERACTION",
    Diabetes => "DIABETES",
    Erosions => "EROSIONS",
    FebuxostatHypersensitivity => "FEBUXOSTATHYPERSENSITIVITY",
    GastricBypass => "GASTRICBYPASS",
    Gout => "GOUT",
    HeartAttack => "HEARTATTACK",
    Hepatitis => "HEPATITIS",
    Hypertension => "HYPERTENSION",
    Hyperuricemia => "HYPERURICEMIA",
    Ibd => "IBD",
    Menopause => "MENOPAUSE",
    OrganTransplant => "ORGANTRANSPLANT",
    Osteoporosis => "OSTEOPOROSIS",
    Pud => "PUD",
    Pvd => "PVD",
    Stroke => "STROKE",
    Tophi => "TOPHI",
    UrateStones => "URATESTONES",
    XoiInteraction => "XOIINTERACTION",
});

str_enum!(DialysisType {
    Hemodialysis => "HEMODIALYSIS",
    Peritoneal => "PERITONEAL",
});

str_enum!(Gender {
    Female => "FEMALE",
    Male => "MALE",
});

str_enum!(Ethnicity {
    AfricanAmerican => "African American",
    CaucasianAmerican => "Caucasian American",
    EastAfrican => "East African",
    HanChinese => "Han Chinese",
    Hispanic => "Hispanic",
    Hmong => "Hmong",
    Korean => "Korean",
    NativeAmerican => "Native American",
    Other => "Other",
    PacificIslander => "Pacific Islander",
    Thai => "Thai",
});

/// CKD severity stage. Ordering is clinical (V worst), used directly for
/// threshold comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CkdStage {
    One = 1,
    Two = 2,
    Three = 3,
    Four = 4,
    Five = 5,
}

impl CkdStage {
    pub fn as_u8(&self) -> u8 {
        *self as u8
    }
}

/// Cardiovascular-disease-class histories. Hypertension is deliberately not
/// part of this class (it only contributes to flare prevalence scoring).
pub const CV_DISEASES: &[MedHistoryType] = &[
    MedHistoryType::Angina,
    MedHistoryType::Cad,
    MedHistoryType::Chf,
    MedHistoryType::HeartAttack,
    MedHistoryType::Stroke,
    MedHistoryType::Pvd,
];

impl MedHistoryType {
    pub fn is_cv_disease(&self) -> bool {
        CV_DISEASES.contains(self)
    }
}

impl Treatment {
    pub fn drug_class(&self) -> DrugClass {
        match self {
            Self::Allopurinol | Self::Febuxostat | Self::Probenecid => DrugClass::Ult,
            Self::Methylprednisolone | Self::Prednisone => DrugClass::Steroid,
            Self::Colchicine => DrugClass::Antiinflammatory,
            Self::Celecoxib
            | Self::Diclofenac
            | Self::Ibuprofen
            | Self::Indomethacin
            | Self::Meloxicam
            | Self::Naproxen => DrugClass::Nsaid,
        }
    }

    pub fn is_nsaid(&self) -> bool {
        self.drug_class() == DrugClass::Nsaid
    }

    pub fn is_steroid(&self) -> bool {
        self.drug_class() == DrugClass::Steroid
    }

    /// Whether this treatment belongs to the given treatment-type catalog.
    /// ULT drugs are ULT-only; everything else treats flares and serves as
    /// prophylaxis.
    pub fn valid_for(&self, trttype: TrtType) -> bool {
        match self.drug_class() {
            DrugClass::Ult => trttype == TrtType::Ult,
            _ => matches!(trttype, TrtType::Flare | TrtType::Ppx),
        }
    }
}

impl Ethnicity {
    /// Ethnicities with a high background prevalence of the HLA-B*58:01
    /// genotype, which confers risk of severe allopurinol hypersensitivity.
    pub fn hlab5801_risk(&self) -> bool {
        matches!(
            self,
            Self::AfricanAmerican | Self::HanChinese | Self::Korean | Self::Thai
        )
    }
}
