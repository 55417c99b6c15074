use serde::{Deserialize, Serialize};

/// Lifecycle of one uploaded document.
///
/// Transitions are monotonic except that `Error` is terminal:
/// `Uploaded -> Extracting -> Extracted -> Processing -> Done`, with a model
/// failure on a single image never forcing the project into `Error` — only a
/// failure during extraction does that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Uploaded,
    Extracting,
    Extracted,
    Processing,
    Done,
    Error,
}

impl std::fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Uploaded => "uploaded",
            Self::Extracting => "extracting",
            Self::Extracted => "extracted",
            Self::Processing => "processing",
            Self::Done => "done",
            Self::Error => "error",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for ProjectStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "uploaded" => Ok(Self::Uploaded),
            "extracting" => Ok(Self::Extracting),
            "extracted" => Ok(Self::Extracted),
            "processing" => Ok(Self::Processing),
            "done" => Ok(Self::Done),
            "error" => Ok(Self::Error),
            other => Err(format!("unknown project status: {other}")),
        }
    }
}

/// One uploaded PDF and its processing state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    /// Opaque owner namespace used for on-disk layout; this crate does not
    /// implement authentication, so callers typically use a fixed value.
    pub owner: String,
    pub source_filename: String,
    pub source_path: String,
    pub status: ProjectStatus,
    pub total_images: u32,
    pub processed_images: u32,
    pub created_at: String,
    pub updated_at: String,
    pub error_message: Option<String>,
}

impl Project {
    pub fn new(id: String, owner: String, source_filename: String, source_path: String, now: &str) -> Self {
        Self {
            id,
            owner,
            source_filename,
            source_path,
            status: ProjectStatus::Uploaded,
            total_images: 0,
            processed_images: 0,
            created_at: now.to_string(),
            updated_at: now.to_string(),
            error_message: None,
        }
    }
}

/// Status of one discovered image within a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageStatus {
    Pending,
    Processing,
    Done,
    Error,
}

impl std::fmt::Display for ImageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Done => "done",
            Self::Error => "error",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for ImageStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "done" => Ok(Self::Done),
            "error" => Ok(Self::Error),
            other => Err(format!("unknown image status: {other}")),
        }
    }
}

/// Confidence the model reported for its own answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Konfidenz {
    Hoch,
    Mittel,
    Niedrig,
}

impl Default for Konfidenz {
    fn default() -> Self {
        Self::Mittel
    }
}

impl std::fmt::Display for Konfidenz {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Hoch => "hoch",
            Self::Mittel => "mittel",
            Self::Niedrig => "niedrig",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for Konfidenz {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hoch" => Ok(Self::Hoch),
            "mittel" => Ok(Self::Mittel),
            "niedrig" => Ok(Self::Niedrig),
            _ => Err(()),
        }
    }
}

/// Classification the model assigns to a described image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bildtyp {
    Foto,
    Diagramm,
    Tabelle,
    Screenshot,
    Icon,
    Logo,
    Karte,
    Dekorativ,
    Unbekannt,
    Fehler,
}

impl std::fmt::Display for Bildtyp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Foto => "foto",
            Self::Diagramm => "diagramm",
            Self::Tabelle => "tabelle",
            Self::Screenshot => "screenshot",
            Self::Icon => "icon",
            Self::Logo => "logo",
            Self::Karte => "karte",
            Self::Dekorativ => "dekorativ",
            Self::Unbekannt => "unbekannt",
            Self::Fehler => "fehler",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for Bildtyp {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "foto" => Ok(Self::Foto),
            "diagramm" | "chart" => Ok(Self::Diagramm),
            "tabelle" | "table" => Ok(Self::Tabelle),
            "screenshot" => Ok(Self::Screenshot),
            "icon" => Ok(Self::Icon),
            "logo" => Ok(Self::Logo),
            "karte" | "map" => Ok(Self::Karte),
            "dekorativ" | "decorative" => Ok(Self::Dekorativ),
            "unbekannt" => Ok(Self::Unbekannt),
            "fehler" => Ok(Self::Fehler),
            _ => Err(()),
        }
    }
}

/// One discovered image, raster or vector-cluster-synthesized.
///
/// `xref` identifies a real PDF cross-reference number for raster images.
/// For vector clusters it is a synthetic value allocated from a counter
/// seeded at [`SYNTHETIC_XREF_BASE`] and never corresponds to a real PDF
/// object — the tagged-PDF writer must skip such descriptors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageDescriptor {
    pub id: String,
    pub project_id: String,
    pub page_number: u32,
    pub image_index: u32,
    pub image_path: String,
    pub ext: String,
    pub width: u32,
    pub height: u32,
    pub xref: u32,
    /// The short `/Name` this image's XObject is referenced by in the
    /// page's resource dictionary. Empty for synthetic vector images.
    pub resource_name: String,
    pub context_text: String,
    pub image_type: Option<Bildtyp>,
    pub alt_text: Option<String>,
    pub alt_text_edited: Option<String>,
    pub konfidenz: Option<Konfidenz>,
    pub raw_response: Option<String>,
    pub status: ImageStatus,
}

/// First xref value reserved for vector-cluster-synthesized images.
pub const SYNTHETIC_XREF_BASE: u32 = 900_000;

impl ImageDescriptor {
    pub fn is_synthetic(&self) -> bool {
        self.xref >= SYNTHETIC_XREF_BASE
    }

    /// The text that should be written to the exported PDF: the user's edit
    /// if present, else the model's answer, with the literal value
    /// `"dekorativ"` normalized to an empty alt-text.
    pub fn effective_alt_text(&self) -> String {
        let text = self
            .alt_text_edited
            .as_deref()
            .or(self.alt_text.as_deref())
            .unwrap_or("");
        if text.trim().eq_ignore_ascii_case("dekorativ") {
            String::new()
        } else {
            text.to_string()
        }
    }
}

/// Canonical parsed answer for one image, produced by the response parser.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AltTextRecord {
    pub bildtyp: Bildtyp,
    pub alt_text: String,
    pub ist_dekorativ: bool,
    pub konfidenz: Konfidenz,
    pub raw_response: String,
}
