//! Interactive form fields, written as AcroForm widgets.
//!
//! Widgets are placed outside the page clip: they are annotations, not page
//! content. Radio buttons sharing a group become kids of one parent field.

use crate::color::Rgb;
use crate::fonts::{encode_win_ansi, BODY_FONT, SYMBOL_FONT};
use doc_model::{ExportRect, FormFieldItem, FormFieldKind, PageElement, PageSize};
use lopdf::{
    dictionary, Dictionary, Document as PdfDocument, Object, ObjectId, Stream, StringFormat,
};
use std::collections::{BTreeMap, HashSet};

const FLAG_REQUIRED: i64 = 1 << 1;
const FLAG_MULTILINE: i64 = 1 << 12;
const FLAG_NO_TOGGLE_TO_OFF: i64 = 1 << 14;
const FLAG_RADIO: i64 = 1 << 15;
const FLAG_COMBO: i64 = 1 << 17;
/// Annotation flag: print the widget.
const ANNOT_PRINT: i64 = 4;
/// ZapfDingbats check mark.
const CHECK_GLYPH: &str = "4";
/// ZapfDingbats filled circle.
const RADIO_GLYPH: &str = "l";

#[derive(Debug, thiserror::Error, PartialEq)]
pub(crate) enum FormError {
    #[error("duplicate field name {0:?}")]
    DuplicateName(String),
    #[error("field name is empty")]
    EmptyName,
    #[error("field geometry is not finite")]
    NonFinite,
}

/// Font resources shared by every widget.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FormFonts {
    pub body: ObjectId,
    pub symbol: ObjectId,
}

struct RadioGroup {
    parent: ObjectId,
    kids: Vec<Object>,
    selected: Option<Vec<u8>>,
    required: bool,
    states: HashSet<Vec<u8>>,
}

impl RadioGroup {
    /// Appearance state for a new kid, suffixed until unique in the group.
    fn claim_state(&mut self, field_name: &str) -> Vec<u8> {
        let base = state_name(field_name);
        let mut state = base.clone();
        let mut suffix = 2;
        while !self.states.insert(state.clone()) {
            state = [base.as_slice(), format!("_{suffix}").as_bytes()].concat();
            suffix += 1;
        }
        state
    }
}

pub(crate) struct FormBuilder {
    fonts: FormFonts,
    page: PageSize,
    fields: Vec<Object>,
    names: HashSet<String>,
    radio_groups: BTreeMap<String, RadioGroup>,
}

fn text_string(text: &str) -> Object {
    Object::String(encode_win_ansi(text).0, StringFormat::Literal)
}

fn color_array(color: Rgb) -> Object {
    color.components().iter().map(|c| Object::Real(*c as f32)).collect::<Vec<_>>().into()
}

/// Whether a default value marks a checkbox or radio as selected.
fn is_checked(value: Option<&str>) -> bool {
    value.is_some_and(|v| {
        ["true", "on", "yes", "checked", "1"].iter().any(|s| v.trim().eq_ignore_ascii_case(s))
    })
}

/// Appearance state name derived from a field name.
fn state_name(field_name: &str) -> Vec<u8> {
    let cleaned: Vec<u8> =
        field_name.bytes().filter(|b| b.is_ascii_alphanumeric() || *b == b'_').collect();
    if cleaned.is_empty() || cleaned == b"Off" {
        b"On".to_vec()
    } else {
        cleaned
    }
}

impl FormBuilder {
    pub fn new(fonts: FormFonts, page: PageSize) -> Self {
        Self {
            fonts,
            page,
            fields: Vec::new(),
            names: HashSet::new(),
            radio_groups: BTreeMap::new(),
        }
    }

    fn rect(&self, field: &FormFieldItem) -> Result<ExportRect, FormError> {
        let rect = field
            .norm_rect()
            .unwrap_or_default()
            .to_pixels(self.page.surface())
            .to_export(self.page.height);
        if [rect.x, rect.y, rect.width, rect.height, field.font_size, field.border_width]
            .iter()
            .all(|v| v.is_finite())
        {
            Ok(rect)
        } else {
            Err(FormError::NonFinite)
        }
    }

    fn symbol_appearance(&self, rect: ExportRect, glyph: &str, color: Rgb) -> Stream {
        let size = (rect.height.min(rect.width) * 0.8).max(1.0);
        let [r, g, b] = color.components();
        let x = (rect.width - size * 0.75) / 2.0;
        let y = (rect.height - size * 0.7) / 2.0;
        let content = format!(
            "q BT /{SYMBOL_FONT} {size:.2} Tf {r:.3} {g:.3} {b:.3} rg \
             {x:.2} {y:.2} Td ({glyph}) Tj ET Q"
        );
        self.appearance(rect, content.into_bytes())
    }

    fn appearance(&self, rect: ExportRect, content: Vec<u8>) -> Stream {
        Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Form",
                "BBox" => vec![
                    Object::Real(0.0),
                    Object::Real(0.0),
                    Object::Real(rect.width as f32),
                    Object::Real(rect.height as f32),
                ],
                "Resources" => dictionary! {
                    "Font" => dictionary! { SYMBOL_FONT => self.fonts.symbol },
                },
            },
            content,
        )
    }

    fn widget(&self, field: &FormFieldItem, rect: ExportRect, page_id: ObjectId) -> Dictionary {
        let background = Rgb::parse_or(&field.background_color, Rgb::WHITE);
        let border = Rgb::parse_or(&field.border_color, Rgb::BLACK);
        let text = Rgb::parse_or(&field.text_color, Rgb::BLACK);
        let [r, g, b] = text.components();
        let font = match field.kind {
            FormFieldKind::Checkbox | FormFieldKind::Radio => SYMBOL_FONT,
            _ => BODY_FONT,
        };

        let mut widget = dictionary! {
            "Type" => "Annot",
            "Subtype" => "Widget",
            "Rect" => vec![
                Object::Real(rect.x as f32),
                Object::Real(rect.y as f32),
                Object::Real((rect.x + rect.width) as f32),
                Object::Real((rect.y + rect.height) as f32),
            ],
            "P" => page_id,
            "F" => ANNOT_PRINT,
            "DA" => Object::string_literal(format!(
                "/{font} {:.2} Tf {r:.3} {g:.3} {b:.3} rg",
                field.font_size
            )),
            "MK" => dictionary! { "BG" => color_array(background), "BC" => color_array(border) },
            "BS" => dictionary! { "W" => Object::Real(field.border_width as f32), "S" => "S" },
        };
        if let Some(tip) = field.label.as_deref().or(field.placeholder.as_deref()) {
            widget.set("TU", text_string(tip));
        }
        widget
    }

    fn claim_name(&mut self, name: &str) -> Result<(), FormError> {
        if name.trim().is_empty() {
            return Err(FormError::EmptyName);
        }
        if !self.names.insert(name.to_owned()) {
            return Err(FormError::DuplicateName(name.to_owned()));
        }
        Ok(())
    }

    /// Adds `field` on `page_id` and returns the widget to list in the
    /// page's `Annots`.
    pub fn add(
        &mut self,
        doc: &mut PdfDocument,
        page_id: ObjectId,
        field: &FormFieldItem,
    ) -> Result<ObjectId, FormError> {
        let rect = self.rect(field)?;
        if field.kind == FormFieldKind::Radio {
            return self.add_radio(doc, page_id, field, rect);
        }
        self.claim_name(&field.field_name)?;

        let mut widget = self.widget(field, rect, page_id);
        widget.set("T", text_string(&field.field_name));
        let required = if field.required { FLAG_REQUIRED } else { 0 };

        match field.kind {
            FormFieldKind::TextInput | FormFieldKind::Textarea => {
                let multiline =
                    if field.kind == FormFieldKind::Textarea { FLAG_MULTILINE } else { 0 };
                widget.set("FT", "Tx");
                widget.set("Ff", required | multiline);
                if let Some(value) = &field.default_value {
                    widget.set("V", text_string(value));
                }
            }
            FormFieldKind::Checkbox => {
                let checked = is_checked(field.default_value.as_deref());
                let state: &[u8] = if checked { b"Yes" } else { b"Off" };
                let text = Rgb::parse_or(&field.text_color, Rgb::BLACK);
                let on = doc.add_object(self.symbol_appearance(rect, CHECK_GLYPH, text));
                let off = doc.add_object(self.appearance(rect, Vec::new()));

                widget.set("FT", "Btn");
                widget.set("Ff", required);
                widget.set("V", Object::Name(state.to_vec()));
                widget.set("AS", Object::Name(state.to_vec()));
                widget.set("AP", dictionary! { "N" => dictionary! { "Yes" => on, "Off" => off } });
                if let Ok(Object::Dictionary(mk)) = widget.get_mut(b"MK") {
                    mk.set("CA", Object::string_literal(CHECK_GLYPH));
                }
            }
            FormFieldKind::Dropdown => {
                widget.set("FT", "Ch");
                widget.set("Ff", required | FLAG_COMBO);
                widget.set(
                    "Opt",
                    field.options.iter().map(|option| text_string(option)).collect::<Vec<_>>(),
                );
                let value = field
                    .default_value
                    .as_ref()
                    .filter(|value| field.options.contains(value))
                    .or_else(|| field.options.first());
                if let Some(value) = value {
                    widget.set("V", text_string(value));
                }
            }
            FormFieldKind::Radio => unreachable!("radio buttons are grouped above"),
        }

        let id = doc.add_object(widget);
        self.fields.push(id.into());
        Ok(id)
    }

    fn add_radio(
        &mut self,
        doc: &mut PdfDocument,
        page_id: ObjectId,
        field: &FormFieldItem,
        rect: ExportRect,
    ) -> Result<ObjectId, FormError> {
        let group_name = field.group_name.clone().unwrap_or_else(|| field.field_name.clone());
        if !self.radio_groups.contains_key(&group_name) {
            self.claim_name(&group_name)?;
        }

        let text = Rgb::parse_or(&field.text_color, Rgb::BLACK);
        let on = doc.add_object(self.symbol_appearance(rect, RADIO_GLYPH, text));
        let off = doc.add_object(self.appearance(rect, Vec::new()));
        let checked = is_checked(field.default_value.as_deref());

        let mut widget = self.widget(field, rect, page_id);
        if let Ok(Object::Dictionary(mk)) = widget.get_mut(b"MK") {
            mk.set("CA", Object::string_literal(RADIO_GLYPH));
        }

        let group = self.radio_groups.entry(group_name).or_insert_with(|| RadioGroup {
            parent: doc.new_object_id(),
            kids: Vec::new(),
            selected: None,
            required: false,
            states: HashSet::new(),
        });
        let state = group.claim_state(&field.field_name);

        let mut normal = Dictionary::new();
        normal.set(state.clone(), on);
        normal.set("Off", off);
        widget.set("AS", Object::Name(if checked { state.clone() } else { b"Off".to_vec() }));
        widget.set("AP", dictionary! { "N" => normal });
        widget.set("Parent", group.parent);
        let id = doc.add_object(widget);
        group.kids.push(id.into());
        group.required |= field.required;
        if checked && group.selected.is_none() {
            group.selected = Some(state);
        }
        Ok(id)
    }

    /// Writes the radio parents and returns the catalog's `AcroForm`, or
    /// `None` when no field was added.
    pub fn finish(self, doc: &mut PdfDocument) -> Option<Dictionary> {
        let mut fields = self.fields;
        for (name, group) in self.radio_groups {
            let required = if group.required { FLAG_REQUIRED } else { 0 };
            let mut parent = dictionary! {
                "FT" => "Btn",
                "T" => text_string(&name),
                "Ff" => FLAG_RADIO | FLAG_NO_TOGGLE_TO_OFF | required,
                "Kids" => group.kids,
            };
            parent.set("V", Object::Name(group.selected.unwrap_or_else(|| b"Off".to_vec())));
            doc.set_object(group.parent, parent);
            fields.push(group.parent.into());
        }

        if fields.is_empty() {
            return None;
        }
        Some(dictionary! {
            "Fields" => fields,
            "NeedAppearances" => true,
            "DA" => Object::string_literal(format!("/{BODY_FONT} 0 Tf 0 g")),
            "DR" => dictionary! {
                "Font" => dictionary! {
                    BODY_FONT => self.fonts.body,
                    SYMBOL_FONT => self.fonts.symbol,
                },
            },
        })
    }
}
