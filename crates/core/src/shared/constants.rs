pub const FACE_CASCADE_NAME: &str = "haarcascade_frontalface_default.xml";
pub const EMOTION_MODEL_NAME: &str = "emotion-ferplus-8.onnx";
pub const AGE_MODEL_NAME: &str = "age_net.onnx";
pub const GENDER_MODEL_NAME: &str = "gender_net.onnx";

/// FER+ output order. Index order maps model outputs to labels.
pub const EMOTION_LABELS: &[&str] = &[
    "neutral",
    "happiness",
    "surprise",
    "sadness",
    "anger",
    "disgust",
    "fear",
    "contempt",
];

/// Position of "happiness" in [`EMOTION_LABELS`]; its probability is the
/// reported smile probability.
pub const SMILE_INDEX: usize = 1;

pub const AGE_BUCKETS: &[&str] = &[
    "(0-2)", "(4-6)", "(8-12)", "(15-20)", "(25-32)", "(38-43)", "(48-53)", "(60-100)",
];

pub const GENDER_LABELS: &[&str] = &["Male", "Female"];

pub const UNKNOWN_LABEL: &str = "Unknown";
pub const EMOTION_FALLBACK_LABEL: &str = "neutral";
pub const NO_FACE_LABEL: &str = "No face detected";

/// Emotion network input side (grayscale, square).
pub const EMOTION_INPUT_SIZE: u32 = 64;

/// Age/gender network input side (3 channels, square).
pub const AGE_GENDER_INPUT_SIZE: u32 = 227;

/// Per-plane mean subtracted from age/gender input, in network plane order
/// (blue, green, red).
pub const AGE_GENDER_MEAN: [f32; 3] = [78.4, 87.7, 114.9];

pub const METADATA_CSV_NAME: &str = "captures_metadata.csv";

/// File kept by `clear()` so the captures directory survives in git checkouts.
pub const GITKEEP_NAME: &str = ".gitkeep";

/// Placeholder written to the metadata CSV for absent numeric values.
pub const MISSING_VALUE: &str = "--";
