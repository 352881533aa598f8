//! Plan payload to document model.
//!
//! Layout contract:
//! - a cover (optional logo, title, business name, identity table)
//! - exactly ten numbered sections, always in the same order
//! - the signature block
//!
//! Every optional value goes through [`clean_field`]; anything missing,
//! blank or not yet computed becomes the localized "not provided" marker,
//! so table rows never lose cells.

use super::labels::{Labels, Language};
use super::text::{clean_field, is_process_control_label};
use super::{
    Block, Column, DocumentMetadata, DocumentModel, ImageBlock, ImageFormat, ParagraphStyle,
    Table,
};
use crate::error::Result;
use crate::plan::{HazardRow, Logo, PlanPayload};
use crate::theme::ThemeDescriptor;
use std::io::Cursor;

/// Version label used when the payload does not carry one.
pub(crate) const DEFAULT_VERSION_LABEL: &str = "1.0";

/// Build the document model for a plan.
///
/// Pure: the same payload and theme always produce an equal model. The
/// payload is expected to have passed [`PlanPayload::validate`].
pub fn render(payload: &PlanPayload, theme: &'static ThemeDescriptor) -> Result<DocumentModel> {
    let language = Language::from_code(payload.language.as_deref());
    let labels = language.labels();
    let r = Renderer { payload, labels };

    let metadata = DocumentMetadata {
        title: labels.document_title.to_string(),
        subtitle: r.text(Some(payload.business.name.as_str())),
        language,
        generated_on: clean_field(payload.generated_on.as_deref()),
        version_label: clean_field(payload.document_version.as_deref())
            .unwrap_or_else(|| DEFAULT_VERSION_LABEL.to_string()),
        theme,
    };

    let mut blocks = Vec::new();
    r.cover(&metadata, &mut blocks);
    r.team_and_scope(&mut blocks);
    r.product(&mut blocks);
    r.intended_use(&mut blocks);
    r.process_flow(&mut blocks);
    r.prerequisite_programs(&mut blocks);
    r.hazard_analysis(&mut blocks);
    r.ccp_determination(&mut blocks);
    r.ccp_management(&mut blocks);
    r.verification(&mut blocks);
    r.records(&mut blocks);
    r.signatures(&mut blocks);

    log::debug!(
        "Rendered plan {} ({} blocks, theme {}, language {})",
        payload.plan_id,
        blocks.len(),
        theme.name,
        language.code()
    );
    Ok(DocumentModel { metadata, blocks })
}

struct Renderer<'a> {
    payload: &'a PlanPayload,
    labels: &'static Labels,
}

impl<'a> Renderer<'a> {
    fn text(&self, value: Option<&str>) -> String {
        clean_field(value).unwrap_or_else(|| self.labels.not_provided.to_string())
    }

    fn header(&self, number: u8, blocks: &mut Vec<Block>) {
        blocks.push(Block::SectionHeader {
            number,
            title: self.labels.sections[number as usize - 1].to_string(),
        });
    }

    fn paragraph(text: String, style: ParagraphStyle, blocks: &mut Vec<Block>) {
        blocks.push(Block::Paragraph { text, style });
    }

    fn labelled(&self, label: &str, value: Option<&str>, blocks: &mut Vec<Block>) {
        Self::paragraph(label.to_string(), ParagraphStyle::Label, blocks);
        Self::paragraph(self.text(value), ParagraphStyle::Body, blocks);
    }

    fn field_table(&self, fields: &[(&str, Option<&str>)]) -> Block {
        Block::Table(Table {
            columns: vec![
                Column::new(self.labels.field, 1.0),
                Column::new(self.labels.value, 2.5),
            ],
            rows: fields
                .iter()
                .map(|(label, value)| vec![label.to_string(), self.text(*value)])
                .collect(),
        })
    }

    fn step_label(&self, position: u32) -> String {
        match self.payload.step_name(position).and_then(|n| clean_field(Some(n))) {
            Some(name) => format!("{}. {}", position, name),
            None => format!("{}. {}", position, self.labels.not_provided),
        }
    }

    fn cover(&self, metadata: &DocumentMetadata, blocks: &mut Vec<Block>) {
        if let Some(image) = self.payload.logo.as_ref().and_then(decode_logo) {
            blocks.push(Block::Image(image));
        }
        Self::paragraph(metadata.title.clone(), ParagraphStyle::Title, blocks);
        Self::paragraph(metadata.subtitle.clone(), ParagraphStyle::Subtitle, blocks);

        let l = self.labels;
        let b = &self.payload.business;
        blocks.push(self.field_table(&[
            (l.business_name, Some(b.name.as_str())),
            (l.address, b.address.as_deref()),
            (l.registration_number, b.registration_number.as_deref()),
            (l.contact_name, b.contact_name.as_deref()),
            (l.contact, b.contact.as_deref()),
            (l.product_name, self.payload.product.name.as_deref()),
            (l.generated_on, metadata.generated_on.as_deref()),
            (l.version, Some(metadata.version_label.as_str())),
        ]));
    }

    fn team_and_scope(&self, blocks: &mut Vec<Block>) {
        self.header(1, blocks);
        let b = &self.payload.business;
        self.labelled(self.labels.scope, b.scope.as_deref(), blocks);

        let mut rows: Vec<Vec<String>> = b
            .team_members
            .iter()
            .map(|m| vec![self.text(m.name.as_deref()), self.text(m.role.as_deref())])
            .collect();
        if rows.is_empty() {
            rows.push(vec![self.text(None), self.text(None)]);
        }
        blocks.push(Block::Table(Table {
            columns: vec![
                Column::new(self.labels.team_name, 1.0),
                Column::new(self.labels.team_role, 1.0),
            ],
            rows,
        }));
    }

    fn product(&self, blocks: &mut Vec<Block>) {
        self.header(2, blocks);
        let l = self.labels;
        let p = &self.payload.product;
        blocks.push(self.field_table(&[
            (l.product_name, p.name.as_deref()),
            (l.description, p.description.as_deref()),
            (l.composition, p.composition.as_deref()),
            (l.packaging, p.packaging.as_deref()),
            (l.shelf_life, p.shelf_life.as_deref()),
            (l.storage, p.storage.as_deref()),
            (l.distribution, p.distribution.as_deref()),
        ]));
    }

    fn intended_use(&self, blocks: &mut Vec<Block>) {
        self.header(3, blocks);
        self.labelled(self.labels.intended_use, self.payload.intended_use.as_deref(), blocks);
        self.labelled(
            self.labels.intended_consumers,
            self.payload.intended_consumers.as_deref(),
            blocks,
        );
    }

    fn process_flow(&self, blocks: &mut Vec<Block>) {
        self.header(4, blocks);
        let rows = self
            .payload
            .ordered_steps()
            .into_iter()
            .map(|s| {
                vec![
                    s.position.to_string(),
                    self.text(Some(s.name.as_str())),
                    self.text(s.description.as_deref()),
                ]
            })
            .collect();
        blocks.push(Block::Table(Table {
            columns: vec![
                Column::new(self.labels.step_number, 0.4),
                Column::new(self.labels.step, 1.6),
                Column::new(self.labels.description, 4.0),
            ],
            rows,
        }));
    }

    fn prerequisite_programs(&self, blocks: &mut Vec<Block>) {
        self.header(5, blocks);
        let mut rows: Vec<Vec<String>> = self
            .payload
            .prerequisite_programs
            .iter()
            .map(|p| {
                vec![
                    self.text(p.name.as_deref()),
                    self.text(p.description.as_deref()),
                    self.text(p.frequency.as_deref()),
                    self.text(p.responsible.as_deref()),
                ]
            })
            .collect();
        if rows.is_empty() {
            rows.push(vec![self.text(None); 4]);
        }
        let l = self.labels;
        blocks.push(Block::Table(Table {
            columns: vec![
                Column::new(l.program, 1.4),
                Column::new(l.description, 3.0),
                Column::new(l.frequency, 1.2),
                Column::new(l.responsible, 1.2),
            ],
            rows,
        }));
    }

    /// Text of the "how it is controlled" column.
    fn control_description(&self, row: &HazardRow) -> String {
        if let Some(description) = row.control_description.as_deref() {
            if description.contains(super::text::NOT_COMPUTED_TOKEN) {
                return self.labels.not_provided.to_string();
            }
            if let Some(text) = clean_field(Some(description)) {
                return text;
            }
        }
        if row.control_measures.iter().any(|m| is_process_control_label(m)) {
            self.labels.process_control_default.to_string()
        } else {
            self.labels.no_description.to_string()
        }
    }

    fn hazard_analysis(&self, blocks: &mut Vec<Block>) {
        self.header(6, blocks);
        let l = self.labels;
        if self.payload.hazards.is_empty() {
            Self::paragraph(l.no_hazards.to_string(), ParagraphStyle::Note, blocks);
            return;
        }

        let rows = self
            .payload
            .hazards
            .iter()
            .map(|h| {
                let measures: Vec<String> = h
                    .control_measures
                    .iter()
                    .filter_map(|m| clean_field(Some(m.as_str())))
                    .collect();
                vec![
                    self.step_label(h.step),
                    self.text(Some(h.hazard.as_str())),
                    h.category
                        .map(|c| l.category(c).to_string())
                        .unwrap_or_else(|| l.not_provided.to_string()),
                    h.severity
                        .map(|v| l.level(v).to_string())
                        .unwrap_or_else(|| l.not_provided.to_string()),
                    h.likelihood
                        .map(|v| l.level(v).to_string())
                        .unwrap_or_else(|| l.not_provided.to_string()),
                    if measures.is_empty() {
                        l.not_provided.to_string()
                    } else {
                        measures.join(", ")
                    },
                    self.control_description(h),
                    if h.is_ccp { l.yes } else { l.no }.to_string(),
                ]
            })
            .collect();
        blocks.push(Block::Table(Table {
            columns: vec![
                Column::new(l.step, 1.2),
                Column::new(l.hazard, 1.6),
                Column::new(l.category, 0.9),
                Column::new(l.severity, 0.8),
                Column::new(l.likelihood, 0.9),
                Column::new(l.control_measures, 1.3),
                Column::new(l.control_description, 2.0),
                Column::new(l.significant, 0.5),
            ],
            rows,
        }));
    }

    fn ccp_id(&self, index: usize) -> String {
        format!("{}{}", self.labels.ccp_prefix, index + 1)
    }

    fn ccp_determination(&self, blocks: &mut Vec<Block>) {
        self.header(7, blocks);
        let l = self.labels;
        if self.payload.ccps.is_empty() {
            Self::paragraph(l.no_ccps.to_string(), ParagraphStyle::Note, blocks);
            return;
        }
        let rows = self
            .payload
            .ccps
            .iter()
            .enumerate()
            .map(|(i, c)| vec![self.ccp_id(i), self.step_label(c.step), self.text(Some(c.hazard.as_str()))])
            .collect();
        blocks.push(Block::Table(Table {
            columns: vec![
                Column::new(l.ccp, 0.6),
                Column::new(l.step, 1.5),
                Column::new(l.hazard, 3.0),
            ],
            rows,
        }));
    }

    fn ccp_management(&self, blocks: &mut Vec<Block>) {
        self.header(8, blocks);
        let l = self.labels;
        if self.payload.ccps.is_empty() {
            Self::paragraph(l.no_ccps.to_string(), ParagraphStyle::Note, blocks);
            return;
        }
        let rows = self
            .payload
            .ccps
            .iter()
            .enumerate()
            .map(|(i, c)| {
                vec![
                    self.ccp_id(i),
                    self.text(c.critical_limit.as_deref()),
                    self.text(c.monitoring.as_deref()),
                    self.text(c.frequency.as_deref()),
                    self.text(c.corrective_action.as_deref()),
                    self.text(c.verification.as_deref()),
                    self.text(c.records.as_deref()),
                ]
            })
            .collect();
        blocks.push(Block::Table(Table {
            columns: vec![
                Column::new(l.ccp, 0.6),
                Column::new(l.critical_limit, 1.3),
                Column::new(l.monitoring, 1.3),
                Column::new(l.frequency, 1.0),
                Column::new(l.corrective_action, 1.4),
                Column::new(l.verification, 1.2),
                Column::new(l.records, 1.1),
            ],
            rows,
        }));
    }

    fn verification(&self, blocks: &mut Vec<Block>) {
        self.header(9, blocks);
        let n = &self.payload.narrative;
        self.labelled(self.labels.verification, n.verification.as_deref(), blocks);
        self.labelled(self.labels.validation, n.validation.as_deref(), blocks);
        self.labelled(self.labels.review, n.review.as_deref(), blocks);
    }

    fn records(&self, blocks: &mut Vec<Block>) {
        self.header(10, blocks);
        Self::paragraph(
            self.text(self.payload.narrative.records.as_deref()),
            ParagraphStyle::Body,
            blocks,
        );
    }

    fn signatures(&self, blocks: &mut Vec<Block>) {
        blocks.push(Block::SignatureLine {
            label: self.labels.prepared_by.to_string(),
            name: clean_field(self.payload.business.contact_name.as_deref()),
        });
        blocks.push(Block::SignatureLine {
            label: self.labels.approved_by.to_string(),
            name: None,
        });
    }
}

/// Sniff and measure a logo. Unsupported or corrupt images are skipped.
fn decode_logo(logo: &Logo) -> Option<ImageBlock> {
    let reader = match image::io::Reader::new(Cursor::new(&logo.data)).with_guessed_format() {
        Ok(reader) => reader,
        Err(e) => {
            log::warn!("Skipping logo: {}", e);
            return None;
        },
    };
    let format = match reader.format() {
        Some(image::ImageFormat::Png) => ImageFormat::Png,
        Some(image::ImageFormat::Jpeg) => ImageFormat::Jpeg,
        other => {
            log::warn!("Skipping logo with unsupported format {:?}", other);
            return None;
        },
    };
    match reader.into_dimensions() {
        Ok((width_px, height_px)) if width_px > 0 && height_px > 0 => Some(ImageBlock {
            data: logo.data.clone(),
            format,
            width_px,
            height_px,
        }),
        Ok(_) => None,
        Err(e) => {
            log::warn!("Skipping unreadable logo: {}", e);
            None
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{NOT_COMPUTED_TOKEN, SECTION_COUNT};
    use crate::plan::{BusinessInfo, CriticalControlPoint, HazardCategory, ProcessStep};
    use crate::theme::resolve_theme;

    fn payload() -> PlanPayload {
        PlanPayload {
            plan_id: "plan-1".to_string(),
            business: BusinessInfo {
                name: "Acme Bakery".to_string(),
                ..Default::default()
            },
            process_steps: vec![
                ProcessStep {
                    position: 1,
                    name: "Receiving".to_string(),
                    description: None,
                },
                ProcessStep {
                    position: 2,
                    name: "Baking".to_string(),
                    description: Some("Oven at 200C".to_string()),
                },
            ],
            ..Default::default()
        }
    }

    fn hazard_table(model: &DocumentModel) -> &Table {
        model
            .section_blocks(6)
            .iter()
            .find_map(|b| match b {
                Block::Table(t) => Some(t),
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn test_sections_are_one_to_ten_in_order() {
        let model = render(&payload(), resolve_theme(None)).unwrap();
        let numbers: Vec<u8> = model.sections().map(|(n, _)| n).collect();
        assert_eq!(numbers, (1..=SECTION_COUNT).collect::<Vec<_>>());
    }

    #[test]
    fn test_tables_are_rectangular() {
        let mut plan = payload();
        plan.hazards.push(HazardRow {
            step: 1,
            hazard: "Contamination".to_string(),
            ..Default::default()
        });
        let model = render(&plan, resolve_theme(None)).unwrap();
        assert!(model.tables().count() >= 5);
        assert!(model.tables().all(Table::is_rectangular));
    }

    #[test]
    fn test_process_control_gets_default_description() {
        let mut plan = payload();
        plan.hazards.push(HazardRow {
            step: 2,
            hazard: "Survival of pathogens".to_string(),
            category: Some(HazardCategory::Biological),
            control_measures: vec!["Process control".to_string()],
            ..Default::default()
        });
        plan.hazards.push(HazardRow {
            step: 1,
            hazard: "Glass".to_string(),
            control_measures: vec!["Supplier approval".to_string()],
            ..Default::default()
        });
        let model = render(&plan, resolve_theme(None)).unwrap();
        let table = hazard_table(&model);
        let labels = Language::English.labels();
        assert_eq!(table.rows[0][6], labels.process_control_default);
        assert_eq!(table.rows[1][6], "-");
    }

    #[test]
    fn test_spanish_process_control_label() {
        let mut plan = payload();
        plan.language = Some("es".to_string());
        plan.hazards.push(HazardRow {
            step: 2,
            hazard: "Supervivencia de patógenos".to_string(),
            control_measures: vec!["  CONTROL DE   PROCESO ".to_string()],
            ..Default::default()
        });
        let model = render(&plan, resolve_theme(None)).unwrap();
        let table = hazard_table(&model);
        assert_eq!(table.rows[0][6], Language::Spanish.labels().process_control_default);
    }

    #[test]
    fn test_supplied_description_is_kept() {
        let mut plan = payload();
        plan.hazards.push(HazardRow {
            step: 2,
            hazard: "Survival of pathogens".to_string(),
            control_measures: vec!["Process control".to_string()],
            control_description: Some("Core temperature 75C".to_string()),
            ..Default::default()
        });
        let model = render(&plan, resolve_theme(None)).unwrap();
        assert_eq!(hazard_table(&model).rows[0][6], "Core temperature 75C");
    }

    #[test]
    fn test_no_ccps_explained_in_sections_7_and_8() {
        let mut plan = payload();
        plan.hazards.push(HazardRow {
            step: 1,
            hazard: "Dust".to_string(),
            is_ccp: false,
            ..Default::default()
        });
        let model = render(&plan, resolve_theme(None)).unwrap();
        let no_ccps = Language::English.labels().no_ccps;
        for section in [7, 8] {
            let blocks = model.section_blocks(section);
            assert!(!blocks.iter().any(|b| matches!(b, Block::Table(_))));
            assert!(blocks
                .iter()
                .any(|b| matches!(b, Block::Paragraph { text, .. } if text == no_ccps)));
        }
    }

    #[test]
    fn test_ccp_tables_when_present() {
        let mut plan = payload();
        plan.hazards.push(HazardRow {
            step: 2,
            hazard: "Survival of pathogens".to_string(),
            is_ccp: true,
            ..Default::default()
        });
        plan.ccps.push(CriticalControlPoint {
            step: 2,
            hazard: "Survival of pathogens".to_string(),
            critical_limit: Some("75C core".to_string()),
            ..Default::default()
        });
        let model = render(&plan, resolve_theme(None)).unwrap();
        let management = model.section_blocks(8);
        let table = management
            .iter()
            .find_map(|b| match b {
                Block::Table(t) => Some(t),
                _ => None,
            })
            .unwrap();
        assert_eq!(table.rows[0][0], "CCP-1");
        assert_eq!(table.rows[0][1], "75C core");
        assert_eq!(table.rows[0][2], "Not provided");
    }

    #[test]
    fn test_placeholder_token_never_rendered() {
        let mut plan = payload();
        plan.intended_use = Some(NOT_COMPUTED_TOKEN.to_string());
        plan.product.name = Some(format!("Bread {}", NOT_COMPUTED_TOKEN));
        plan.narrative.records = Some(NOT_COMPUTED_TOKEN.to_string());
        plan.hazards.push(HazardRow {
            step: 1,
            hazard: NOT_COMPUTED_TOKEN.to_string(),
            control_description: Some(NOT_COMPUTED_TOKEN.to_string()),
            ..Default::default()
        });
        let model = render(&plan, resolve_theme(None)).unwrap();
        assert!(model
            .text_content()
            .iter()
            .all(|t| !t.contains(NOT_COMPUTED_TOKEN)));
    }

    #[test]
    fn test_missing_fields_render_marker() {
        let model = render(&payload(), resolve_theme(None)).unwrap();
        let blocks = model.section_blocks(3);
        assert!(blocks
            .iter()
            .any(|b| matches!(b, Block::Paragraph { text, .. } if text == "Not provided")));
    }

    #[test]
    fn test_invalid_logo_is_skipped() {
        let mut plan = payload();
        plan.logo = Some(Logo {
            data: b"not an image".to_vec(),
        });
        let model = render(&plan, resolve_theme(None)).unwrap();
        assert!(model.image().is_none());
    }

    #[test]
    fn test_render_is_deterministic() {
        let plan = payload();
        let theme = resolve_theme(Some("modern"));
        assert_eq!(render(&plan, theme).unwrap(), render(&plan, theme).unwrap());
    }

    #[test]
    fn test_version_label_default() {
        let model = render(&payload(), resolve_theme(None)).unwrap();
        assert_eq!(model.metadata.version_label, DEFAULT_VERSION_LABEL);
    }
}
