use chrono::{DateTime, Utc};
use std::cmp::Ordering;

use crate::model::{Sheet, SheetId, SortBy, Tag};
use crate::transfer::sheet_name_from_file;

/// Field changes for one sheet. `None` leaves the field alone.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SheetPatch {
    pub name: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl SheetPatch {
    pub fn name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    pub fn tags(tags: Vec<String>) -> Self {
        Self {
            tags: Some(tags),
            ..Self::default()
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SheetQuery {
    pub search: String,
    /// A sheet must carry every one of these tags.
    pub tags: Vec<String>,
    pub sort_by: SortBy,
}

/// Sheets and tag definitions as the popup currently sees them.
///
/// Every mutation that changes something bumps `revision`, which lets the
/// persistence side tell a newer snapshot from an older one.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Library {
    sheets: Vec<Sheet>,
    tags: Vec<Tag>,
    revision: u64,
}

impl Library {
    pub fn from_parts(sheets: Vec<Sheet>, tags: Vec<Tag>) -> Self {
        Self {
            sheets,
            tags,
            revision: 0,
        }
    }

    /// Takes over records read from storage, keeping anything created before
    /// they arrived on top of them.
    pub fn absorb_loaded(&mut self, loaded: Library) {
        let edited = self.revision > 0;
        let local_sheets = std::mem::replace(&mut self.sheets, loaded.sheets);
        let local_tags = std::mem::replace(&mut self.tags, loaded.tags);

        for mut sheet in local_sheets.into_iter().rev() {
            while self.sheet(sheet.id).is_some() {
                sheet.id = SheetId(sheet.id.0 + 1);
            }
            self.sheets.insert(0, sheet);
        }
        for tag in local_tags {
            if self.tag(&tag.name).is_none() {
                self.tags.push(tag);
            }
        }
        if edited {
            self.touch();
        }
    }

    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }

    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn sheet(&self, id: SheetId) -> Option<&Sheet> {
        self.sheets.iter().find(|sheet| sheet.id == id)
    }

    pub fn tag(&self, name: &str) -> Option<&Tag> {
        self.tags.iter().find(|tag| tag.name == name)
    }

    fn touch(&mut self) {
        self.revision += 1;
    }

    fn next_id(&self, now: DateTime<Utc>) -> SheetId {
        let mut id = SheetId::from_timestamp(now);
        while self.sheet(id).is_some() {
            id = SheetId(id.0 + 1);
        }
        id
    }

    /// New sheets go to the top of the list.
    pub fn create_sheet(
        &mut self,
        name: impl Into<String>,
        content: impl Into<String>,
        now: DateTime<Utc>,
    ) -> SheetId {
        let id = self.next_id(now);
        self.sheets.insert(0, Sheet::new(id, name, content, now));
        self.touch();
        id
    }

    pub fn import_text(&mut self, file_name: &str, text: &str, now: DateTime<Utc>) -> SheetId {
        self.create_sheet(sheet_name_from_file(file_name), text, now)
    }

    pub fn update_sheet(&mut self, id: SheetId, patch: SheetPatch, now: DateTime<Utc>) -> bool {
        let Some(sheet) = self.sheets.iter_mut().find(|sheet| sheet.id == id) else {
            return false;
        };
        if let Some(name) = patch.name {
            sheet.name = name;
        }
        if let Some(content) = patch.content {
            sheet.content = content;
        }
        if let Some(tags) = patch.tags {
            sheet.tags = tags;
        }
        sheet.updated_at = now;
        self.touch();
        true
    }

    pub fn delete_sheet(&mut self, id: SheetId) -> Option<Sheet> {
        let index = self.sheets.iter().position(|sheet| sheet.id == id)?;
        let removed = self.sheets.remove(index);
        self.touch();
        Some(removed)
    }

    pub fn replace_tags(&mut self, tags: Vec<Tag>) {
        self.tags = tags;
        self.touch();
    }

    /// Empty and duplicate names are refused.
    pub fn add_tag(&mut self, name: &str, color: &str) -> bool {
        if name.is_empty() || self.tag(name).is_some() {
            return false;
        }
        let mut tags = self.tags.clone();
        tags.push(Tag::new(name, color));
        self.replace_tags(tags);
        true
    }

    /// Sheets keep referencing the removed name.
    pub fn remove_tag(&mut self, name: &str) -> bool {
        if self.tag(name).is_none() {
            return false;
        }
        let kept = self
            .tags
            .iter()
            .filter(|tag| tag.name != name)
            .cloned()
            .collect();
        self.replace_tags(kept);
        true
    }

    /// Tag definitions for a sheet, skipping names with no definition.
    pub fn resolved_tags<'a>(&'a self, sheet: &'a Sheet) -> impl Iterator<Item = &'a Tag> + 'a {
        sheet.tags.iter().filter_map(move |name| self.tag(name))
    }

    pub fn visible_sheets(&self, query: &SheetQuery) -> Vec<Sheet> {
        let needle = query.search.to_lowercase();
        let mut visible: Vec<Sheet> = self
            .sheets
            .iter()
            .filter(|sheet| {
                needle.is_empty()
                    || sheet.name.to_lowercase().contains(&needle)
                    || sheet
                        .tags
                        .iter()
                        .any(|tag| tag.to_lowercase().contains(&needle))
            })
            .filter(|sheet| query.tags.iter().all(|tag| sheet.has_tag(tag)))
            .cloned()
            .collect();
        visible.sort_by(|a, b| compare_sheets(a, b, query.sort_by));
        visible
    }
}

fn compare_sheets(a: &Sheet, b: &Sheet, sort_by: SortBy) -> Ordering {
    match sort_by {
        SortBy::Date => b.updated_at.cmp(&a.updated_at),
        SortBy::Name => a
            .name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.name.cmp(&b.name)),
    }
}
