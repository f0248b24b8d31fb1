pub mod enums;
pub mod facts;
pub mod records;

pub use enums::{
    CkdStage, Contraindication, DialysisType, DrugClass, Ethnicity, Freq, Gender, MedHistoryType,
    Treatment, TrtType, CV_DISEASES,
};
pub use facts::{
    AidSubject, CkdDetail, Demographics, FactSet, MedAllergy, MedHistory, SubjectOwner,
};
pub use records::{ContraRecord, DosingRecord, SettingsRecord, UltPolicy, MAX_PREFERENCES};
