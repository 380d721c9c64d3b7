use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use crate::attachments::Attachment;
use crate::core::{Alignment, ListKind, Marks};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkKind {
    Bold,
    Italic,
    Underline,
}

impl MarkKind {
    pub fn get(self, marks: &Marks) -> bool {
        match self {
            MarkKind::Bold => marks.bold,
            MarkKind::Italic => marks.italic,
            MarkKind::Underline => marks.underline,
        }
    }

    pub fn set(self, marks: &mut Marks, value: bool) {
        match self {
            MarkKind::Bold => marks.bold = value,
            MarkKind::Italic => marks.italic = value,
            MarkKind::Underline => marks.underline = value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorChannel {
    Text,
    Highlight,
}

/// Raw image bytes plus their mime type, as handed over by a signature pad
/// or an image file picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl ImageData {
    pub fn new(mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            mime: mime.into(),
            bytes,
        }
    }

    /// Parses a base64 `data:` URL such as a canvas export.
    pub fn from_data_url(url: &str) -> Option<Self> {
        let rest = url.strip_prefix("data:")?;
        let (header, payload) = rest.split_once(',')?;
        let mime = header.strip_suffix(";base64")?;
        let bytes = STANDARD.decode(payload.trim()).ok()?;
        Some(Self::new(mime, bytes))
    }

    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime, STANDARD.encode(&self.bytes))
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    ToggleMark(MarkKind),
    SetAlignment(Alignment),
    SetFontSize(u32),
    SetListType(ListKind),
    /// `None` clears the color.
    SetColor(ColorChannel, Option<String>),
    InsertLink(String),
    RemoveLink,
    InsertAttachment(Attachment),
    InsertSignatureImage(ImageData),
    InsertImage { image: ImageData, alt: String },
    InsertEmoji(String),
    InsertText(String),
    InsertLineBreak,
    SplitBlock,
    DeleteBackward,
    DeleteSelection,
    RemoveList,
    IndentListItem,
    OutdentListItem,
    SetHeading(Option<u8>),
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::ToggleMark(_) => "toggle_mark",
            Command::SetAlignment(_) => "set_alignment",
            Command::SetFontSize(_) => "set_font_size",
            Command::SetListType(_) => "set_list_type",
            Command::SetColor(..) => "set_color",
            Command::InsertLink(_) => "insert_link",
            Command::RemoveLink => "remove_link",
            Command::InsertAttachment(_) => "insert_attachment",
            Command::InsertSignatureImage(_) => "insert_signature_image",
            Command::InsertImage { .. } => "insert_image",
            Command::InsertEmoji(_) => "insert_emoji",
            Command::InsertText(_) => "insert_text",
            Command::InsertLineBreak => "insert_line_break",
            Command::SplitBlock => "split_block",
            Command::DeleteBackward => "delete_backward",
            Command::DeleteSelection => "delete_selection",
            Command::RemoveList => "remove_list",
            Command::IndentListItem => "indent_list_item",
            Command::OutdentListItem => "outdent_list_item",
            Command::SetHeading(_) => "set_heading",
        }
    }

    /// Commands issued from pickers that steal focus; they run against the
    /// saved selection when the editor is not focused.
    pub fn restores_saved_selection(&self) -> bool {
        matches!(self, Command::SetColor(..) | Command::InsertEmoji(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_url_round_trip() {
        let image = ImageData::new("image/png", vec![137, 80, 78, 71]);
        let url = image.to_data_url();
        assert_eq!(url, "data:image/png;base64,iVBORw==");
        assert_eq!(ImageData::from_data_url(&url), Some(image));
        assert_eq!(ImageData::from_data_url("data:image/png,raw"), None);
    }
}
