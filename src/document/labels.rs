//! Localized document strings.

use crate::plan::{HazardCategory, Level};

/// Output language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    /// English (default)
    English,
    /// Spanish
    Spanish,
}

impl Language {
    /// Resolve a language code. Region subtags are ignored; unknown codes give English.
    pub fn from_code(code: Option<&str>) -> Self {
        let code = code.unwrap_or("").trim().to_lowercase();
        let primary = code.split(['-', '_']).next().unwrap_or("");
        match primary {
            "es" | "spa" | "spanish" | "espanol" | "español" => Language::Spanish,
            _ => Language::English,
        }
    }

    /// BCP 47 code.
    pub fn code(&self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Spanish => "es",
        }
    }

    /// Label table for this language.
    pub fn labels(&self) -> &'static Labels {
        match self {
            Language::English => &EN,
            Language::Spanish => &ES,
        }
    }
}

/// Every user-visible string the renderer and serializers emit.
///
/// Field names follow the payload field or table column they caption.
#[allow(missing_docs)]
#[derive(Debug)]
pub struct Labels {
    pub document_title: &'static str,
    pub not_provided: &'static str,
    pub no_description: &'static str,
    pub process_control_default: &'static str,
    pub sections: [&'static str; 10],

    pub field: &'static str,
    pub value: &'static str,
    pub business_name: &'static str,
    pub address: &'static str,
    pub registration_number: &'static str,
    pub contact_name: &'static str,
    pub contact: &'static str,
    pub generated_on: &'static str,
    pub version: &'static str,

    pub scope: &'static str,
    pub team_name: &'static str,
    pub team_role: &'static str,

    pub product_name: &'static str,
    pub description: &'static str,
    pub composition: &'static str,
    pub packaging: &'static str,
    pub shelf_life: &'static str,
    pub storage: &'static str,
    pub distribution: &'static str,

    pub intended_use: &'static str,
    pub intended_consumers: &'static str,

    pub step_number: &'static str,
    pub step: &'static str,

    pub program: &'static str,
    pub frequency: &'static str,
    pub responsible: &'static str,

    pub hazard: &'static str,
    pub category: &'static str,
    pub severity: &'static str,
    pub likelihood: &'static str,
    pub control_measures: &'static str,
    pub control_description: &'static str,
    pub significant: &'static str,
    pub yes: &'static str,
    pub no: &'static str,
    pub no_hazards: &'static str,
    pub categories: [&'static str; 4],
    pub levels: [&'static str; 3],

    pub ccp: &'static str,
    pub ccp_prefix: &'static str,
    pub critical_limit: &'static str,
    pub monitoring: &'static str,
    pub corrective_action: &'static str,
    pub verification: &'static str,
    pub records: &'static str,
    pub no_ccps: &'static str,

    pub validation: &'static str,
    pub review: &'static str,

    pub prepared_by: &'static str,
    pub approved_by: &'static str,

    pub page: &'static str,
    pub of: &'static str,
}

impl Labels {
    /// Localized hazard category.
    pub fn category(&self, category: HazardCategory) -> &'static str {
        match category {
            HazardCategory::Biological => self.categories[0],
            HazardCategory::Chemical => self.categories[1],
            HazardCategory::Physical => self.categories[2],
            HazardCategory::Allergen => self.categories[3],
        }
    }

    /// Localized severity / likelihood level.
    pub fn level(&self, level: Level) -> &'static str {
        match level {
            Level::Low => self.levels[0],
            Level::Medium => self.levels[1],
            Level::High => self.levels[2],
        }
    }

    /// Running footer text.
    pub fn footer(&self, version: &str, page: usize, total: usize) -> String {
        format!("{} {} | {} {} {} {}", self.version, version, self.page, page, self.of, total)
    }
}

static EN: Labels = Labels {
    document_title: "HACCP Plan",
    not_provided: "Not provided",
    no_description: "-",
    process_control_default: "Controlled by following the documented process parameters for this step (time, temperature and handling), verified during routine monitoring.",
    sections: [
        "HACCP Team and Scope",
        "Product Description",
        "Intended Use",
        "Process Flow",
        "Prerequisite Programs",
        "Hazard Analysis",
        "CCP Determination",
        "CCP Management",
        "Verification and Validation",
        "Records",
    ],

    field: "Field",
    value: "Value",
    business_name: "Business name",
    address: "Address",
    registration_number: "Registration number",
    contact_name: "Contact person",
    contact: "Contact",
    generated_on: "Generated on",
    version: "Version",

    scope: "Scope",
    team_name: "Name",
    team_role: "Role",

    product_name: "Product name",
    description: "Description",
    composition: "Composition",
    packaging: "Packaging",
    shelf_life: "Shelf life",
    storage: "Storage conditions",
    distribution: "Distribution",

    intended_use: "Intended use",
    intended_consumers: "Intended consumers",

    step_number: "#",
    step: "Step",

    program: "Program",
    frequency: "Frequency",
    responsible: "Responsible",

    hazard: "Hazard",
    category: "Category",
    severity: "Severity",
    likelihood: "Likelihood",
    control_measures: "Control measures",
    control_description: "How it is controlled",
    significant: "CCP",
    yes: "Yes",
    no: "No",
    no_hazards: "No hazards were recorded for this process.",
    categories: ["Biological", "Chemical", "Physical", "Allergen"],
    levels: ["Low", "Medium", "High"],

    ccp: "CCP",
    ccp_prefix: "CCP-",
    critical_limit: "Critical limit",
    monitoring: "Monitoring",
    corrective_action: "Corrective action",
    verification: "Verification",
    records: "Records",
    no_ccps: "No critical control points were identified. All hazards are controlled by the prerequisite programs and process controls described above.",

    validation: "Validation",
    review: "Review",

    prepared_by: "Prepared by",
    approved_by: "Approved by",

    page: "Page",
    of: "of",
};

static ES: Labels = Labels {
    document_title: "Plan HACCP",
    not_provided: "No proporcionado",
    no_description: "-",
    process_control_default: "Se controla siguiendo los parámetros de proceso documentados para esta etapa (tiempo, temperatura y manipulación), verificados durante el monitoreo de rutina.",
    sections: [
        "Equipo HACCP y alcance",
        "Descripción del producto",
        "Uso previsto",
        "Diagrama de flujo del proceso",
        "Programas de prerrequisitos",
        "Análisis de peligros",
        "Determinación de PCC",
        "Gestión de PCC",
        "Verificación y validación",
        "Registros",
    ],

    field: "Campo",
    value: "Valor",
    business_name: "Razón social",
    address: "Dirección",
    registration_number: "Número de registro",
    contact_name: "Persona de contacto",
    contact: "Contacto",
    generated_on: "Fecha de generación",
    version: "Versión",

    scope: "Alcance",
    team_name: "Nombre",
    team_role: "Función",

    product_name: "Nombre del producto",
    description: "Descripción",
    composition: "Composición",
    packaging: "Envase",
    shelf_life: "Vida útil",
    storage: "Condiciones de almacenamiento",
    distribution: "Distribución",

    intended_use: "Uso previsto",
    intended_consumers: "Consumidores previstos",

    step_number: "#",
    step: "Etapa",

    program: "Programa",
    frequency: "Frecuencia",
    responsible: "Responsable",

    hazard: "Peligro",
    category: "Categoría",
    severity: "Severidad",
    likelihood: "Probabilidad",
    control_measures: "Medidas de control",
    control_description: "Cómo se controla",
    significant: "PCC",
    yes: "Sí",
    no: "No",
    no_hazards: "No se registraron peligros para este proceso.",
    categories: ["Biológico", "Químico", "Físico", "Alérgeno"],
    levels: ["Baja", "Media", "Alta"],

    ccp: "PCC",
    ccp_prefix: "PCC-",
    critical_limit: "Límite crítico",
    monitoring: "Monitoreo",
    corrective_action: "Acción correctiva",
    verification: "Verificación",
    records: "Registros",
    no_ccps: "No se identificaron puntos críticos de control. Todos los peligros se controlan mediante los programas de prerrequisitos y los controles de proceso descritos anteriormente.",

    validation: "Validación",
    review: "Revisión",

    prepared_by: "Elaborado por",
    approved_by: "Aprobado por",

    page: "Página",
    of: "de",
};
