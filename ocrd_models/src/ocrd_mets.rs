//! # METS Document API
//!
//! [`OcrdMets`] wraps a single METS file and offers the operations OCR-D
//! workspaces need: listing and searching `mets:file` entries, managing
//! `mets:fileGrp`s, mapping files to physical pages, and reading or setting
//! the document's unique identifier and agents.
//!
//! Files are returned as [`OcrdFile`] snapshots; all changes go through
//! methods on [`OcrdMets`] so the tree stays the single source of truth.

use crate::{
    constants::{IDENTIFIER_PRIORITY, METS_XML_EMPTY, NS_METS, NS_MODS, NS_XLINK},
    error::MetsError,
    ocrd_agent::OcrdAgent,
    ocrd_file::{NewFile, OcrdFile},
    xml::{Element, Node, XmlDocument},
};
use chrono::Local;
use ocrd_utils::{
    StringFilter,
    constants::{REGEX_PREFIX, VERSION},
    str_utils::is_local_filename,
};
use std::{
    collections::{HashMap, HashSet},
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing::{debug, info};

/// Criteria for [`OcrdMets::find_files`].
///
/// `id`, `file_grp`, `mimetype` and `url` are literal values, or regular
/// expressions when prefixed with `//` (matched against the whole value).
/// `page_id` is a comma-separated list of literal page IDs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileQuery {
    pub id: Option<String>,
    pub file_grp: Option<String>,
    pub page_id: Option<String>,
    pub mimetype: Option<String>,
    pub url: Option<String>,
    pub local_only: bool,
}

impl FileQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn file_grp(mut self, file_grp: impl Into<String>) -> Self {
        self.file_grp = Some(file_grp.into());
        self
    }

    pub fn page_id(mut self, page_id: impl Into<String>) -> Self {
        self.page_id = Some(page_id.into());
        self
    }

    pub fn mimetype(mut self, mimetype: impl Into<String>) -> Self {
        self.mimetype = Some(mimetype.into());
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn local_only(mut self, local_only: bool) -> Self {
        self.local_only = local_only;
        self
    }
}

fn compile_filter(expr: &Option<String>) -> Result<Option<StringFilter>, MetsError> {
    match expr.as_deref().filter(|e| !e.is_empty()) {
        None => Ok(None),
        Some(e) => StringFilter::parse(e)
            .map(Some)
            .map_err(|source| MetsError::InvalidFilter {
                expr: e.to_string(),
                source,
            }),
    }
}

fn is_div_of_type(el: &Element, div_type: &str) -> bool {
    el.is(NS_METS, "div") && el.attr("TYPE") == Some(div_type)
}

fn is_physical_struct_map(el: &Element) -> bool {
    el.is(NS_METS, "structMap") && el.attr("TYPE") == Some("PHYSICAL")
}

fn is_fptr_for(el: &Element, file_id: &str) -> bool {
    el.is(NS_METS, "fptr") && el.attr("FILEID") == Some(file_id)
}

fn is_file_with_id(el: &Element, file_id: &str) -> bool {
    el.is(NS_METS, "file") && el.attr("ID") == Some(file_id)
}

fn is_identifier_of_type(el: &Element, id_type: &str) -> bool {
    el.is(NS_MODS, "identifier") && el.attr("type") == Some(id_type)
}

fn is_file_grp(el: &Element, use_: &str) -> bool {
    el.is(NS_METS, "fileGrp") && el.attr("USE") == Some(use_)
}

/// Remove `fptr`s for `file_id` below `el`; page divs left without children
/// go as well. Returns whether `el` itself lost an `fptr`.
fn remove_fptrs(el: &mut Element, file_id: &str) -> bool {
    let mut removed = false;
    el.children.retain_mut(|node| {
        let Node::Element(child) = node else {
            return true;
        };
        if is_fptr_for(child, file_id) {
            removed = true;
            return false;
        }
        if remove_fptrs(child, file_id) && !child.has_elements() {
            info!("Delete empty page {}", child.attr("ID").unwrap_or_default());
            return false;
        }
        true
    });
    removed
}

fn remove_first_where(el: &mut Element, pred: &dyn Fn(&Element) -> bool) -> bool {
    if el.remove_elements(pred) > 0 {
        return true;
    }
    el.elements_mut().any(|child| remove_first_where(child, pred))
}

/// API to a single METS document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrdMets {
    doc: XmlDocument,
}

impl OcrdMets {
    /// A new METS from the bundled template. `now` defaults to the current
    /// local time.
    pub fn empty_mets(now: Option<&str>) -> Result<Self, MetsError> {
        let now = match now {
            Some(now) => now.to_string(),
            None => Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
        };
        let xml = METS_XML_EMPTY
            .replace("{{ VERSION }}", VERSION)
            .replace("{{ NOW }}", &now);
        Self::parse(&xml)
    }

    pub fn parse(xml: &str) -> Result<Self, MetsError> {
        let doc = XmlDocument::parse(xml)?;
        if !doc.root.is(NS_METS, "mets") {
            return Err(MetsError::NotMets(doc.root.name.clone()));
        }
        Ok(Self { doc })
    }

    pub fn from_file(path: &Path) -> Result<Self, MetsError> {
        let xml = std::fs::read_to_string(path).map_err(|source| MetsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&xml)
    }

    /// Serialized, pretty-printed document.
    pub fn to_xml(&self) -> String {
        self.doc.to_xml_string()
    }

    pub fn document(&self) -> &XmlDocument {
        &self.doc
    }

    // ------------------------------------------------------------------
    // Identifier and agents
    // ------------------------------------------------------------------

    /// The first `mods:identifier` by type priority `purl`, `urn`, `doi`, `url`.
    pub fn unique_identifier(&self) -> Option<String> {
        IDENTIFIER_PRIORITY.iter().find_map(|t| {
            self.doc
                .root
                .find_descendant(&|e: &Element| is_identifier_of_type(e, t))
                .map(Element::text)
        })
    }

    /// Overwrite the highest-priority identifier, or add a `purl` identifier
    /// to `mods:mods` (creating the descriptive metadata section if needed).
    pub fn set_unique_identifier(&mut self, identifier: &str) {
        for t in IDENTIFIER_PRIORITY {
            if let Some(el) = self
                .doc
                .root
                .find_descendant_mut(&|e: &Element| is_identifier_of_type(e, t))
            {
                el.set_text(identifier);
                return;
            }
        }
        let mods_name = self.doc.qualified_name(NS_MODS, "mods", "mods");
        let identifier_name = self.doc.qualified_name(NS_MODS, "mods", "identifier");
        if self
            .doc
            .root
            .find_descendant(&|e: &Element| e.is(NS_MODS, "mods"))
            .is_none()
        {
            self.create_dmd_sec(mods_name);
        }
        if let Some(mods) = self
            .doc
            .root
            .find_descendant_mut(&|e: &Element| e.is(NS_MODS, "mods"))
        {
            let mut el = Element::new(identifier_name, Some(NS_MODS));
            el.set_attr("type", "purl");
            el.set_text(identifier);
            mods.append(el);
        }
    }

    fn create_dmd_sec(&mut self, mods_name: String) {
        let mut dmd_sec = self.doc.create_element(NS_METS, "mets", "dmdSec");
        dmd_sec.set_attr("ID", "DMDLOG_0001");
        let mut md_wrap = self.doc.create_element(NS_METS, "mets", "mdWrap");
        md_wrap.set_attr("MDTYPE", "MODS");
        let mut xml_data = self.doc.create_element(NS_METS, "mets", "xmlData");
        xml_data.append(Element::new(mods_name, Some(NS_MODS)));
        md_wrap.append(xml_data);
        dmd_sec.append(md_wrap);
        let index = self
            .doc
            .root
            .position_of_last(NS_METS, "metsHdr")
            .map_or(0, |i| i + 1);
        self.doc.root.insert(index, dmd_sec);
    }

    pub fn agents(&self) -> Vec<OcrdAgent> {
        self.doc
            .root
            .find(NS_METS, "metsHdr")
            .map(|hdr| {
                hdr.find_all(NS_METS, "agent")
                    .map(OcrdAgent::from_element)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Append an agent to `mets:metsHdr`, creating the header as the first
    /// child of the document if needed.
    pub fn add_agent(&mut self, agent: &OcrdAgent) {
        let el = agent.to_element(&mut self.doc);
        if self.doc.root.find(NS_METS, "metsHdr").is_none() {
            let hdr = self.doc.create_element(NS_METS, "mets", "metsHdr");
            self.doc.root.insert(0, hdr);
        }
        if let Some(hdr) = self.doc.root.find_mut(NS_METS, "metsHdr") {
            hdr.append(el);
        }
    }

    // ------------------------------------------------------------------
    // Files and file groups
    // ------------------------------------------------------------------

    /// `USE` of every `mets:fileGrp`, in document order.
    pub fn file_groups(&self) -> Vec<String> {
        self.doc
            .root
            .descendants()
            .into_iter()
            .filter(|e| e.is(NS_METS, "fileGrp"))
            .map(|e| e.attr("USE").unwrap_or_default().to_string())
            .collect()
    }

    /// `(fileGrp USE, mets:file)` for every file, in document order.
    fn file_elements(&self) -> Vec<(&str, &Element)> {
        let mut out = Vec::new();
        for grp in self.doc.root.descendants() {
            if grp.is(NS_METS, "fileGrp") {
                let use_ = grp.attr("USE").unwrap_or_default();
                out.extend(grp.find_all(NS_METS, "file").map(|f| (use_, f)));
            }
        }
        out
    }

    fn physical_page_divs(&self) -> Vec<&Element> {
        let mut pages = Vec::new();
        for struct_map in self.doc.root.elements().filter(|e| is_physical_struct_map(e)) {
            for seq in struct_map
                .elements()
                .filter(|e| is_div_of_type(e, "physSequence"))
            {
                pages.extend(seq.elements().filter(|e| is_div_of_type(e, "page")));
            }
        }
        pages
    }

    fn physical_page_divs_mut(&mut self) -> Vec<&mut Element> {
        let mut pages = Vec::new();
        for struct_map in self.doc.root.elements_mut() {
            if !is_physical_struct_map(struct_map) {
                continue;
            }
            for seq in struct_map.elements_mut() {
                if !is_div_of_type(seq, "physSequence") {
                    continue;
                }
                for page in seq.elements_mut() {
                    if is_div_of_type(page, "page") {
                        pages.push(page);
                    }
                }
            }
        }
        pages
    }

    /// FILEID to the first physical page referencing it.
    fn page_map(&self) -> HashMap<&str, &str> {
        let mut map = HashMap::new();
        for page in self.physical_page_divs() {
            let page_id = page.attr("ID").unwrap_or_default();
            for fptr in page.find_all(NS_METS, "fptr") {
                if let Some(file_id) = fptr.attr("FILEID") {
                    map.entry(file_id).or_insert(page_id);
                }
            }
        }
        map
    }

    fn snapshot(file_grp: &str, el: &Element, pages: &HashMap<&str, &str>) -> OcrdFile {
        let id = el.attr("ID").unwrap_or_default().to_string();
        let url = el
            .find(NS_METS, "FLocat")
            .and_then(|f| f.attr_ns(NS_XLINK, "href"))
            .map(str::to_string);
        let local_filename = url
            .as_deref()
            .filter(|u| is_local_filename(u))
            .map(|u| PathBuf::from(u.strip_prefix("file://").unwrap_or(u)));
        OcrdFile {
            page_id: pages.get(id.as_str()).map(|p| p.to_string()),
            id,
            file_grp: file_grp.to_string(),
            mimetype: el.attr("MIMETYPE").map(str::to_string),
            url,
            group_id: el.attr("GROUPID").map(str::to_string),
            local_filename,
        }
    }

    /// Search `mets:file` entries. See [`FileQuery`] for the matching rules.
    pub fn find_files(&self, query: &FileQuery) -> Result<Vec<OcrdFile>, MetsError> {
        let id = compile_filter(&query.id)?;
        let file_grp = compile_filter(&query.file_grp)?;
        let mimetype = compile_filter(&query.mimetype)?;
        let url = compile_filter(&query.url)?;

        let page_files: Option<HashSet<&str>> =
            match query.page_id.as_deref().filter(|p| !p.is_empty()) {
                None => None,
                Some(p) if p.starts_with(REGEX_PREFIX) => return Err(MetsError::PageIdRegex),
                Some(p) => {
                    let wanted: Vec<&str> = p.split(',').collect();
                    Some(
                        self.doc
                            .root
                            .descendants()
                            .into_iter()
                            .filter(|e| is_div_of_type(e, "page"))
                            .filter(|e| e.attr("ID").is_some_and(|id| wanted.contains(&id)))
                            .flat_map(|page| {
                                page.find_all(NS_METS, "fptr")
                                    .filter_map(|f| f.attr("FILEID"))
                            })
                            .collect(),
                    )
                }
            };

        let pages = self.page_map();
        let mut ret = Vec::new();
        for (grp, el) in self.file_elements() {
            let file_id = el.attr("ID");
            if let Some(f) = &id
                && !f.matches(file_id)
            {
                continue;
            }
            if let Some(files) = &page_files
                && !file_id.is_some_and(|i| files.contains(i))
            {
                continue;
            }
            if let Some(f) = &file_grp
                && !f.matches(Some(grp))
            {
                continue;
            }
            if let Some(f) = &mimetype
                && !f.matches(el.attr("MIMETYPE"))
            {
                continue;
            }
            let file = Self::snapshot(grp, el, &pages);
            if let Some(f) = &url
                && !f.matches(file.url.as_deref())
            {
                continue;
            }
            if query.local_only && !file.is_local() {
                continue;
            }
            ret.push(file);
        }
        Ok(ret)
    }

    /// All files, in document order.
    pub fn files(&self) -> Vec<OcrdFile> {
        let pages = self.page_map();
        self.file_elements()
            .into_iter()
            .map(|(grp, el)| Self::snapshot(grp, el, &pages))
            .collect()
    }

    pub fn file_by_id(&self, id: &str) -> Option<OcrdFile> {
        let pages = self.page_map();
        self.file_elements()
            .into_iter()
            .find(|(_, el)| el.attr("ID") == Some(id))
            .map(|(grp, el)| Self::snapshot(grp, el, &pages))
    }

    /// Raw `mets:file` element, for attributes this API does not cover.
    pub fn file_element_mut(&mut self, id: &str) -> Option<&mut Element> {
        self.doc
            .root
            .find_descendant_mut(&|e: &Element| is_file_with_id(e, id))
    }

    /// Add a `mets:fileGrp` unless one with this `USE` exists.
    pub fn add_file_group(&mut self, file_grp: &str) -> Result<(), MetsError> {
        if file_grp.contains(',') {
            return Err(MetsError::FileGrpComma(file_grp.to_string()));
        }
        if self.doc.root.find(NS_METS, "fileSec").is_none() {
            let file_sec = self.doc.create_element(NS_METS, "mets", "fileSec");
            let index = self
                .doc
                .root
                .children
                .iter()
                .position(|n| matches!(n, Node::Element(e) if e.is(NS_METS, "structMap")))
                .unwrap_or(self.doc.root.children.len());
            self.doc.root.insert(index, file_sec);
        }
        let mut grp = self.doc.create_element(NS_METS, "mets", "fileGrp");
        grp.set_attr("USE", file_grp);
        if let Some(file_sec) = self.doc.root.find_mut(NS_METS, "fileSec") {
            file_sec.get_or_append(|e| is_file_grp(e, file_grp), || grp);
        }
        Ok(())
    }

    /// Remove a fileGrp. A non-empty group needs `recursive`, which removes
    /// its files first.
    pub fn remove_file_group(&mut self, file_grp: &str, recursive: bool) -> Result<(), MetsError> {
        let file_sec = self
            .doc
            .root
            .find(NS_METS, "fileSec")
            .ok_or(MetsError::NoFileSec)?;
        let grp = file_sec
            .elements()
            .find(|e| is_file_grp(e, file_grp))
            .ok_or_else(|| MetsError::NoSuchFileGrp(file_grp.to_string()))?;
        let file_ids: Vec<String> = grp
            .find_all(NS_METS, "file")
            .filter_map(|f| f.attr("ID"))
            .map(str::to_string)
            .collect();
        if !file_ids.is_empty() {
            if !recursive {
                return Err(MetsError::FileGrpNotEmpty(file_grp.to_string()));
            }
            for id in &file_ids {
                self.remove_file(id)?;
            }
        }
        if let Some(file_sec) = self.doc.root.find_mut(NS_METS, "fileSec") {
            file_sec.remove_elements(|e| is_file_grp(e, file_grp));
        }
        Ok(())
    }

    /// Add a file to `file_grp` (created on demand).
    ///
    /// An existing file with the same ID is an error unless `force` is set,
    /// in which case that entry is updated in place.
    pub fn add_file(
        &mut self,
        file_grp: &str,
        file: NewFile,
        force: bool,
    ) -> Result<OcrdFile, MetsError> {
        if file.id.is_empty() {
            return Err(MetsError::MissingFileId);
        }
        self.add_file_group(file_grp)?;
        if self.file_element_mut(&file.id).is_some() {
            if !force {
                return Err(MetsError::DuplicateFileId(file.id));
            }
            debug!("Updating existing file {}", file.id);
        } else {
            let mut el = self.doc.create_element(NS_METS, "mets", "file");
            el.set_attr("ID", file.id.as_str());
            let grp = self
                .doc
                .root
                .find_descendant_mut(&|e: &Element| is_file_grp(e, file_grp))
                .ok_or_else(|| MetsError::NoSuchFileGrp(file_grp.to_string()))?;
            grp.append(el);
        }

        if let Some(mimetype) = &file.mimetype
            && let Some(el) = self.file_element_mut(&file.id)
        {
            el.set_attr("MIMETYPE", mimetype.as_str());
        }
        if let Some(url) = &file.url {
            self.set_file_url(&file.id, url)?;
        }
        if let Some(page_id) = &file.page_id {
            self.set_physical_page_for_file(page_id, &file.id, None, None);
        }

        let mut ret = self
            .file_by_id(&file.id)
            .ok_or_else(|| MetsError::FileNotFound(file.id.clone()))?;
        if file.local_filename.is_some() {
            ret.local_filename = file.local_filename;
        }
        Ok(ret)
    }

    /// Point a file's `mets:FLocat` at `url`.
    pub fn set_file_url(&mut self, id: &str, url: &str) -> Result<(), MetsError> {
        let flocat_name = self.doc.qualified_name(NS_METS, "mets", "FLocat");
        let href_name = self.doc.qualified_name(NS_XLINK, "xlink", "href");
        let el = self
            .file_element_mut(id)
            .ok_or_else(|| MetsError::FileNotFound(id.to_string()))?;
        let flocat = el.get_or_append(
            |e| e.is(NS_METS, "FLocat"),
            || {
                let mut f = Element::new(flocat_name, Some(NS_METS));
                f.set_attr("LOCTYPE", "URL");
                f
            },
        );
        flocat.set_attr_ns(NS_XLINK, &href_name, url);
        Ok(())
    }

    /// Delete a file and its page references. Pages left empty are removed.
    pub fn remove_file(&mut self, id: &str) -> Result<OcrdFile, MetsError> {
        info!("remove_file({id})");
        let file = self
            .file_by_id(id)
            .ok_or_else(|| MetsError::FileNotFound(id.to_string()))?;
        remove_fptrs(&mut self.doc.root, id);
        remove_first_where(&mut self.doc.root, &|e: &Element| is_file_with_id(e, id));
        Ok(file)
    }

    // ------------------------------------------------------------------
    // Physical pages
    // ------------------------------------------------------------------

    /// IDs of all physical pages, in order.
    pub fn physical_pages(&self) -> Vec<String> {
        self.physical_page_divs()
            .into_iter()
            .filter_map(|p| p.attr("ID"))
            .map(str::to_string)
            .collect()
    }

    /// Page ID for each of `file_ids` (`None` where a file has no page).
    pub fn get_physical_pages(&self, file_ids: &[&str]) -> Vec<Option<String>> {
        let pages = self.page_map();
        file_ids
            .iter()
            .map(|id| pages.get(id).map(|p| p.to_string()))
            .collect()
    }

    pub fn get_physical_page_for_file(&self, file_id: &str) -> Option<String> {
        self.page_map().get(file_id).map(|p| p.to_string())
    }

    /// Map a file to a physical page, replacing any previous mapping. The
    /// page (and the physical structMap) is created if needed.
    pub fn set_physical_page_for_file(
        &mut self,
        page_id: &str,
        file_id: &str,
        order: Option<&str>,
        orderlabel: Option<&str>,
    ) {
        for page in self.physical_page_divs_mut() {
            page.remove_elements(|e| is_fptr_for(e, file_id));
        }

        let struct_map_name = self.doc.qualified_name(NS_METS, "mets", "structMap");
        let div_name = self.doc.qualified_name(NS_METS, "mets", "div");
        let mut fptr = self.doc.create_element(NS_METS, "mets", "fptr");
        fptr.set_attr("FILEID", file_id);

        let struct_map = self.doc.root.get_or_append(is_physical_struct_map, || {
            let mut el = Element::new(struct_map_name, Some(NS_METS));
            el.set_attr("TYPE", "PHYSICAL");
            el
        });
        let seq = struct_map.get_or_append(
            |e| is_div_of_type(e, "physSequence"),
            || {
                let mut el = Element::new(div_name.clone(), Some(NS_METS));
                el.set_attr("TYPE", "physSequence");
                el
            },
        );
        let page = seq.get_or_append(
            |e| e.is(NS_METS, "div") && e.attr("ID") == Some(page_id),
            || {
                let mut el = Element::new(div_name.clone(), Some(NS_METS));
                el.set_attr("TYPE", "page");
                el.set_attr("ID", page_id);
                if let Some(order) = order {
                    el.set_attr("ORDER", order);
                }
                if let Some(orderlabel) = orderlabel {
                    el.set_attr("ORDERLABEL", orderlabel);
                }
                el
            },
        );
        page.append(fptr);
    }

    pub fn remove_physical_page(&mut self, page_id: &str) {
        for struct_map in self.doc.root.elements_mut() {
            if !is_physical_struct_map(struct_map) {
                continue;
            }
            for seq in struct_map.elements_mut() {
                if is_div_of_type(seq, "physSequence") {
                    seq.remove_elements(|e| {
                        is_div_of_type(e, "page") && e.attr("ID") == Some(page_id)
                    });
                }
            }
        }
    }
}

impl FromStr for OcrdMets {
    type Err = MetsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for OcrdMets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let files: Vec<String> = self.files().into_iter().map(|f| f.id).collect();
        write!(
            f,
            "OcrdMets[fileGrps={:?},files={:?}]",
            self.file_groups(),
            files
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mets_with_files() -> OcrdMets {
        let mut mets = OcrdMets::empty_mets(Some("2024-01-01T00:00:00")).unwrap();
        mets.add_file(
            "OCR-D-IMG",
            NewFile::new("FILE_0001_IMAGE")
                .mimetype("image/tiff")
                .url("OCR-D-IMG/FILE_0001_IMAGE.tif")
                .page_id("PHYS_0001"),
            false,
        )
        .unwrap();
        mets.add_file(
            "OCR-D-IMG",
            NewFile::new("FILE_0002_IMAGE")
                .mimetype("image/tiff")
                .url("https://example.org/0002.tif")
                .page_id("PHYS_0002"),
            false,
        )
        .unwrap();
        mets.add_file(
            "OCR-D-GT-PAGE",
            NewFile::new("FILE_0001_PAGE")
                .mimetype("application/vnd.prima.page+xml")
                .url("file:///data/OCR-D-GT-PAGE/0001.xml")
                .page_id("PHYS_0001"),
            false,
        )
        .unwrap();
        mets
    }

    #[test]
    fn test_empty_mets() {
        let mets = OcrdMets::empty_mets(Some("NOW")).unwrap();
        assert!(mets.file_groups().is_empty());
        assert!(mets.files().is_empty());
        assert!(mets.unique_identifier().is_none());
        let agents = mets.agents();
        assert_eq!(agents.len(), 1);
        assert_eq!(agents[0].name.as_deref(), Some(&*format!("ocrd/core v{VERSION}")));
        assert!(mets.to_xml().contains("CREATEDATE=\"NOW\""));
    }

    #[test]
    fn test_find_files_filters() {
        let mets = mets_with_files();
        assert_eq!(mets.find_files(&FileQuery::new()).unwrap().len(), 3);
        assert_eq!(
            mets.find_files(&FileQuery::new().file_grp("OCR-D-IMG"))
                .unwrap()
                .len(),
            2
        );
        assert_eq!(
            mets.find_files(&FileQuery::new().id("//FILE_0001_.*"))
                .unwrap()
                .len(),
            2
        );
        assert!(
            mets.find_files(&FileQuery::new().id("//FILE_0001"))
                .unwrap()
                .is_empty(),
            "regex must match the whole ID"
        );
        assert_eq!(
            mets.find_files(&FileQuery::new().mimetype("//image/.*"))
                .unwrap()
                .len(),
            2
        );
        assert_eq!(
            mets.find_files(&FileQuery::new().url("https://example.org/0002.tif"))
                .unwrap()[0]
                .id,
            "FILE_0002_IMAGE"
        );
        assert_eq!(
            mets.find_files(&FileQuery::new().local_only(true))
                .unwrap()
                .len(),
            2
        );
    }

    #[test]
    fn test_find_files_by_page() {
        let mets = mets_with_files();
        let found = mets
            .find_files(&FileQuery::new().page_id("PHYS_0001"))
            .unwrap();
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|f| f.page_id.as_deref() == Some("PHYS_0001")));
        assert_eq!(
            mets.find_files(&FileQuery::new().page_id("PHYS_0001,PHYS_0002"))
                .unwrap()
                .len(),
            3
        );
        assert!(matches!(
            mets.find_files(&FileQuery::new().page_id("//PHYS.*")),
            Err(MetsError::PageIdRegex)
        ));
    }

    #[test]
    fn test_invalid_regex_filter() {
        let mets = mets_with_files();
        assert!(matches!(
            mets.find_files(&FileQuery::new().id("//(unclosed")),
            Err(MetsError::InvalidFilter { .. })
        ));
    }

    #[test]
    fn test_add_file_duplicate_and_force() {
        let mut mets = mets_with_files();
        let err = mets
            .add_file("OCR-D-IMG", NewFile::new("FILE_0001_IMAGE"), false)
            .unwrap_err();
        assert_eq!(err.to_string(), "File with ID='FILE_0001_IMAGE' already exists");

        let updated = mets
            .add_file(
                "OCR-D-IMG",
                NewFile::new("FILE_0001_IMAGE").url("OCR-D-IMG/other.tif"),
                true,
            )
            .unwrap();
        assert_eq!(updated.url.as_deref(), Some("OCR-D-IMG/other.tif"));
        assert_eq!(updated.mimetype.as_deref(), Some("image/tiff"));
        assert_eq!(mets.files().len(), 3);
    }

    #[test]
    fn test_add_file_requires_id() {
        let mut mets = OcrdMets::empty_mets(None).unwrap();
        assert!(matches!(
            mets.add_file("OCR-D-IMG", NewFile::default(), false),
            Err(MetsError::MissingFileId)
        ));
    }

    #[test]
    fn test_file_groups() {
        let mut mets = mets_with_files();
        assert_eq!(mets.file_groups(), vec!["OCR-D-IMG", "OCR-D-GT-PAGE"]);
        mets.add_file_group("OCR-D-IMG").unwrap();
        assert_eq!(mets.file_groups().len(), 2);
        assert!(matches!(
            mets.add_file_group("A,B"),
            Err(MetsError::FileGrpComma(_))
        ));
    }

    #[test]
    fn test_remove_file_group() {
        let mut mets = mets_with_files();
        assert!(matches!(
            mets.remove_file_group("OCR-D-IMG", false),
            Err(MetsError::FileGrpNotEmpty(_))
        ));
        assert!(matches!(
            mets.remove_file_group("NOPE", false),
            Err(MetsError::NoSuchFileGrp(_))
        ));
        mets.remove_file_group("OCR-D-IMG", true).unwrap();
        assert_eq!(mets.file_groups(), vec!["OCR-D-GT-PAGE"]);
        assert_eq!(mets.files().len(), 1);
        assert_eq!(mets.physical_pages(), vec!["PHYS_0001"]);
    }

    #[test]
    fn test_remove_file_prunes_empty_pages() {
        let mut mets = mets_with_files();
        let removed = mets.remove_file("FILE_0002_IMAGE").unwrap();
        assert_eq!(removed.file_grp, "OCR-D-IMG");
        assert_eq!(mets.physical_pages(), vec!["PHYS_0001"]);
        mets.remove_file("FILE_0001_IMAGE").unwrap();
        assert_eq!(mets.physical_pages(), vec!["PHYS_0001"]);
        assert!(matches!(
            mets.remove_file("FILE_0001_IMAGE"),
            Err(MetsError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_physical_pages() {
        let mut mets = mets_with_files();
        assert_eq!(mets.physical_pages(), vec!["PHYS_0001", "PHYS_0002"]);
        assert_eq!(
            mets.get_physical_pages(&["FILE_0002_IMAGE", "missing"]),
            vec![Some("PHYS_0002".to_string()), None]
        );
        mets.set_physical_page_for_file("PHYS_0003", "FILE_0002_IMAGE", Some("3"), None);
        assert_eq!(
            mets.get_physical_page_for_file("FILE_0002_IMAGE").as_deref(),
            Some("PHYS_0003")
        );
        mets.remove_physical_page("PHYS_0002");
        assert_eq!(mets.physical_pages(), vec!["PHYS_0001", "PHYS_0003"]);
    }

    #[test]
    fn test_unique_identifier() {
        let mut mets = OcrdMets::empty_mets(None).unwrap();
        mets.set_unique_identifier("foo");
        assert_eq!(mets.unique_identifier().as_deref(), Some("foo"));
        mets.set_unique_identifier("bar");
        assert_eq!(mets.unique_identifier().as_deref(), Some("bar"));
        assert_eq!(mets.to_xml().matches("mods:identifier type=").count(), 1);

        let reparsed = OcrdMets::parse(&mets.to_xml()).unwrap();
        assert_eq!(reparsed.unique_identifier().as_deref(), Some("bar"));
    }

    #[test]
    fn test_unique_identifier_priority() {
        let mets = OcrdMets::parse(
            r#"<mets:mets xmlns:mets="http://www.loc.gov/METS/" xmlns:mods="http://www.loc.gov/mods/v3">
              <mets:dmdSec><mets:mdWrap><mets:xmlData><mods:mods>
                <mods:identifier type="url">u</mods:identifier>
                <mods:identifier type="urn">n</mods:identifier>
              </mods:mods></mets:xmlData></mets:mdWrap></mets:dmdSec>
            </mets:mets>"#,
        )
        .unwrap();
        assert_eq!(mets.unique_identifier().as_deref(), Some("n"));
    }

    #[test]
    fn test_set_identifier_without_dmd_sec() {
        let mut mets =
            OcrdMets::parse(r#"<mets:mets xmlns:mets="http://www.loc.gov/METS/"/>"#).unwrap();
        mets.set_unique_identifier("purl-1");
        assert_eq!(mets.unique_identifier().as_deref(), Some("purl-1"));
        assert!(mets.to_xml().contains("xmlns:mods="));
    }

    #[test]
    fn test_agents() {
        let mut mets =
            OcrdMets::parse(r#"<mets:mets xmlns:mets="http://www.loc.gov/METS/"/>"#).unwrap();
        let mut agent = OcrdAgent::software("ocrd-dummy", "preprocessing/optimization");
        agent.notes.push("parameters: {}".to_string());
        mets.add_agent(&agent);
        let agents = mets.agents();
        assert_eq!(agents, vec![agent]);
        assert!(mets.to_xml().contains("<mets:metsHdr>"));
    }

    #[test]
    fn test_rejects_non_mets() {
        assert!(matches!(
            OcrdMets::parse("<foo/>"),
            Err(MetsError::NotMets(_))
        ));
    }

    #[test]
    fn test_display() {
        let mets = mets_with_files();
        assert_eq!(
            mets.to_string(),
            "OcrdMets[fileGrps=[\"OCR-D-IMG\", \"OCR-D-GT-PAGE\"],files=[\"FILE_0001_IMAGE\", \"FILE_0002_IMAGE\", \"FILE_0001_PAGE\"]]"
        );
    }
}
