//! Static code-membership tables.
//!
//! Each clinical condition is defined by an immutable set of ICD-9 billing
//! or procedure codes. The sets are compiled in, loaded once, and only ever
//! used for membership tests; nothing mutates them at runtime. Code lists
//! follow the published definitions for each scoring instrument.

/// An immutable, named set of diagnosis/procedure code strings.
#[derive(Debug, Clone, Copy)]
pub struct CodeSet {
    pub name: &'static str,
    codes: &'static [&'static str],
}

impl CodeSet {
    /// Membership test against the raw code string as it appears in the
    /// source table (no zero-padding or dot normalization is applied).
    #[must_use]
    pub fn contains(&self, code: &str) -> bool {
        self.codes.iter().any(|c| *c == code)
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.codes.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

/// Qualifying CABG procedure codes. Admissions without one of these are
/// outside the target population and never become records.
pub const CABG: CodeSet = CodeSet {
    name: "cabg",
    codes: &[
        "3610", "3611", "3612", "3613", "3614", "3615", "3616", "3617", "3619",
    ],
};

/// Congestive heart failure / left ventricular dysfunction.
pub const CHF: CodeSet = CodeSet {
    name: "chf",
    codes: &["4280", "4281"],
};

/// Hypertension.
pub const HYPERTENSION: CodeSet = CodeSet {
    name: "hbp",
    codes: &["4010", "4011", "4019"],
};

/// Diabetes mellitus.
pub const DIABETES: CodeSet = CodeSet {
    name: "dm",
    codes: &[
        "24900", "24901", "24910", "24911", "24920", "24921", "24930", "24931", "24940", "24941",
        "24950", "24951", "24960", "24961", "24970", "24971", "24980", "24981", "24990", "24991",
        "25000", "25001", "25002", "25003", "25010", "25011", "25012", "25013", "25020", "25021",
        "25022", "25023", "25030", "25031", "25032", "25033", "25040", "25041", "25042", "25043",
        "25050", "25051", "25052", "25053", "25060", "25061", "25062", "25063", "25070", "25071",
        "25072", "25073", "25080", "25081", "25082", "25083", "25090", "25091", "25092", "25093",
        "64800", "64801", "64802", "64803", "64804",
    ],
};

/// History of stroke / transient ischemic attack / thromboembolism.
pub const STROKE: CodeSet = CodeSet {
    name: "stroke",
    codes: &["V1254"],
};

/// Vascular disease (broad cardiovascular set).
pub const VASCULAR_DISEASE: CodeSet = CodeSet {
    name: "vd",
    codes: &[
        "393", "3940", "3941", "3942", "3949", "3950", "3951", "3952", "3959", "3960", "3961",
        "3962", "3963", "3968", "3969", "3970", "3971", "3979", "3980", "4010", "4011", "4019",
        "40200", "40201", "40210", "40211", "40290", "40291", "40300", "40310", "40311", "40390",
        "40391", "40400", "40401", "40402", "40403", "40410", "40411", "40412", "40413", "40490",
        "40491", "40492", "40493", "40501", "40509", "40511", "40519", "40591", "40599", "41000",
        "41001", "41002", "41010", "41011", "41012", "41020", "41021", "41022", "41030", "41031",
        "41032", "41040", "41041", "41042", "41050", "41051", "41052", "41060", "41061", "41062",
        "41070", "41071", "41072", "41080", "41081", "41082", "41090", "41091", "41092", "4110",
        "4111", "41181", "41189", "412", "4130", "4131", "4139", "41400", "41401", "41402",
        "41403", "41404", "41405", "41406", "41407", "41410", "41411", "41412", "41419", "4142",
        "4143", "4144", "4148", "4149", "4150", "41511", "41512", "41513", "41519", "4160",
        "4161", "4162", "4168", "4169", "4170", "4171", "4178", "4179", "4200", "42090", "42091",
        "42099", "4210", "4211", "4219", "4220", "42290", "42291", "42292", "42293", "42299",
        "4230", "4231", "4232", "4233", "4238", "4239", "4240", "4241", "4242", "4243", "42490",
        "42491", "42499", "4250", "42511", "42518", "4252", "4253", "4254", "4255", "4257",
        "4258", "4259", "4260", "42610", "42611", "42612", "42613", "4262", "4263", "4264",
        "42650", "42651", "42652", "42653", "42654", "4266", "4267", "42681", "42682", "42689",
        "4269", "4270", "4271", "4272", "42731", "42732", "42741", "42742", "4275", "42760",
        "42761", "42769", "42781", "42789", "4279", "4280", "4281", "42820", "42821", "42822",
        "42823", "42830", "42831", "42832", "42840", "42841", "42842", "42843", "4289", "4290",
        "4291", "4292", "4293", "4294", "4295", "4296", "42971", "42979", "42981", "42982",
        "42983", "42989", "4299", "43390", "430", "431", "4320", "4321", "4329", "43300",
        "43301", "43310", "43320", "43321", "43330", "43331", "43380", "43381", "43391", "43400",
        "43401", "43410", "43411", "43490", "43491", "4350", "4351", "4352", "4353", "4358",
        "436", "4370", "4371", "4372", "4373", "4374", "4375", "4376", "4377", "4378", "4379",
        "4380", "43810", "43811", "43812", "43813", "43814", "43819", "43820", "43821", "43822",
        "43830", "43831", "43840", "43841", "43842", "43850", "43851", "43852", "43853", "4386",
        "4387", "43881", "43882", "43883", "4400", "4401", "44020", "44021", "44022", "44023",
        "44024", "44029", "44030", "44031", "44032", "4404", "4408", "4409", "44100", "44101",
        "44102", "44103", "4411", "4412", "4413", "4414", "4415", "4416", "4417", "4419", "4420",
        "4421", "4422", "4423", "44281", "44282", "44283", "44284", "44289", "4429", "4430",
        "4431", "44321", "44322", "44323", "44324", "44329", "44381", "44389", "4439", "44401",
        "44409", "4441", "44421", "44481", "44489", "4449", "44501", "44502", "44581", "44589",
        "4460", "4461", "44620", "44621", "44629", "4463", "4464", "4465", "4466", "4467",
        "4470", "4471", "4472", "4473", "4474", "4475", "4476", "44770", "44771", "44772",
        "44773", "4478", "4479", "4480", "4481", "4489", "449",
    ],
};

/// Peripheral vascular disease.
pub const PERIPHERAL_VASCULAR: CodeSet = CodeSet {
    name: "pvd",
    codes: &[
        "44020", "44021", "44022", "44023", "44024", "44029", "4430", "4431", "44321", "44322",
        "44323", "44324", "44329", "44381", "44389", "4439", "45981", "74760", "74769", "9972",
    ],
};

/// Left atrial dilation.
pub const LEFT_ATRIAL_DILATION: CodeSet = CodeSet {
    name: "lad",
    codes: &["4293"],
};

/// Mitral valve disease (any severity; severity disambiguation happens in
/// the feature extractor via the clinical notes).
pub const MITRAL_VALVE: CodeSet = CodeSet {
    name: "mvd",
    codes: &[
        "3940", "3941", "3942", "3949", "3960", "3961", "3962", "3963", "3968", "3969",
    ],
};

/// Chronic obstructive pulmonary disease.
pub const COPD: CodeSet = CodeSet {
    name: "copd",
    codes: &["49320", "49321", "49322"],
};

/// Myocardial infarction.
pub const MYOCARDIAL_INFARCTION: CodeSet = CodeSet {
    name: "mi",
    codes: &[
        "41000", "41001", "41002", "41010", "41011", "41012", "41020", "41021", "41022", "41030",
        "41031", "41032", "41040", "41041", "41042", "41050", "41051", "41052", "41060", "41061",
        "41062", "41070", "41071", "41072", "41080", "41081", "41082", "41090", "41091", "41092",
    ],
};

/// Atrial fibrillation, the outcome every score is validated against.
pub const AF_OUTCOME: CodeSet = CodeSet {
    name: "af",
    codes: &["42731"],
};

/// Intra-aortic balloon pump (procedure table).
pub const IABP: CodeSet = CodeSet {
    name: "iabp",
    codes: &["3596"],
};

/// Combined valve/artery surgery (procedure table).
pub const COMBINED_VALVE_ARTERY: CodeSet = CodeSet {
    name: "cvas",
    codes: &[
        "3500", "3501", "3502", "3503", "3504", "3505", "3506", "3507", "3509", "3510", "3511",
        "3512", "3513", "3514", "3520", "3521", "3522", "3523", "3524", "3525", "3526", "3527",
        "3528", "3539", "3599",
    ],
};

/// Dialysis (procedure table).
pub const DIALYSIS: CodeSet = CodeSet {
    name: "dialysis",
    codes: &["3895", "3995", "5498"],
};
