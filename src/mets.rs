//! METS/MODS document assembler.
//!
//! Builds one METS document per unit as a typed [`Element`] tree. Sections
//! are emitted in a fixed order:
//!
//! 1. `metsHdr`: creation date, creating institution, software agent
//! 2. `dmdSec`: shape-specific MODS for the root, a title-only MODS per child
//! 3. `amdSec`: DFG-Viewer rights block
//! 4. `fileSec`: `DEFAULT`, then `THUMBS` and `FULLTEXT` when complete
//! 5. `structMap TYPE="PHYSICAL"`: one div per page with its file pointers
//! 6. `structMap TYPE="LOGICAL"`: root division and its children
//! 7. `structLink`: logical → physical links from the page windows
//!
//! A file role appears only when every page has a file for it, so every
//! `FILEID` in the physical map resolves to exactly one `mets:file`.
//! [`verify_references`] re-checks this and the `structLink` targets on the
//! finished tree.

use crate::config::{DocumentType, Metadata};
use crate::ids::{AMD_ID, PHYS_SEQUENCE_ID, RIGHTS_ID, file_id, file_ids, phys_id};
use crate::naming::{file_name, issue_number, issue_order};
use crate::shape::{UnitDates, UnitDescriptor};
use crate::structure::{StructuralUnit, struct_links};
use crate::types::{FileRole, PageImage};
use crate::xml::Element;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};

pub const METS_NS: &str = "http://www.loc.gov/METS/";
pub const MODS_NS: &str = "http://www.loc.gov/mods/v3";
pub const XLINK_NS: &str = "http://www.w3.org/1999/xlink";
pub const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";
pub const DV_NS: &str = "http://dfg-viewer.de/";
const SCHEMA_LOCATION: &str = concat!(
    "http://www.loc.gov/mods/v3 http://www.loc.gov/standards/mods/v3/mods-3-8.xsd ",
    "http://www.loc.gov/METS/ http://www.loc.gov/standards/mets/mets.xsd"
);
const ZDB_ORGANISATIONS: &str = "http://ld.zdb-services.de/resource/organisations/";

/// Name of the software agent in the METS header.
pub fn software_agent() -> String {
    format!("mets-packager {}", env!("CARGO_PKG_VERSION"))
}

/// Inputs for one document.
pub struct MetsDocument<'a> {
    pub metadata: &'a Metadata,
    pub unit: &'a UnitDescriptor,
    pub root: &'a StructuralUnit,
    pub pages: &'a [PageImage],
    pub created: DateTime<Utc>,
}

impl MetsDocument<'_> {
    fn timestamp(&self) -> String {
        self.created.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }

    /// Roles present for every page, in fileSec order.
    pub fn file_roles(&self) -> Vec<FileRole> {
        FileRole::ALL
            .into_iter()
            .filter(|&role| {
                role == FileRole::Default
                    || (!self.pages.is_empty() && self.pages.iter().all(|p| p.file(role).is_some()))
            })
            .collect()
    }

    fn href(&self, page: &PageImage, role: FileRole) -> Option<String> {
        let name = file_name(page.file(role)?);
        Some(match self.metadata.objects.image_base_url.as_deref() {
            Some(base) if base.ends_with('/') => format!("{base}{name}"),
            Some(base) => format!("{base}/{name}"),
            None => name,
        })
    }
}

/// Assemble the complete `mets:mets` element.
pub fn assemble(doc: &MetsDocument<'_>) -> Element {
    Element::new("mets:mets")
        .attr("xmlns:mets", METS_NS)
        .attr("xmlns:mods", MODS_NS)
        .attr("xmlns:xlink", XLINK_NS)
        .attr("xmlns:xsi", XSI_NS)
        .attr("xmlns:dv", DV_NS)
        .attr("xsi:schemaLocation", SCHEMA_LOCATION)
        .attr("OBJID", doc.unit.identifier.as_str())
        .attr("TYPE", doc.unit.shape.as_str())
        .child(header(doc))
        .child(root_dmd_sec(doc))
        .children(doc.root.children.iter().map(child_dmd_sec))
        .child(amd_sec(doc.metadata))
        .child(file_sec(doc))
        .child(physical_struct_map(doc))
        .child(logical_struct_map(doc))
        .child(struct_link(doc.root))
}

// ============================================================================
// Header
// ============================================================================

fn header(doc: &MetsDocument<'_>) -> Element {
    let ts = doc.timestamp();
    Element::new("mets:metsHdr")
        .attr("CREATEDATE", ts.as_str())
        .attr("LASTMODDATE", ts.as_str())
        .child(
            Element::new("mets:agent")
                .attr("ROLE", "CREATOR")
                .attr("TYPE", "ORGANIZATION")
                .child(Element::with_text(
                    "mets:name",
                    doc.metadata.institution.name.as_str(),
                )),
        )
        .child(
            Element::new("mets:agent")
                .attr("ROLE", "OTHER")
                .attr("TYPE", "OTHER")
                .attr("OTHERTYPE", "SOFTWARE")
                .child(Element::with_text("mets:name", software_agent())),
        )
}

// ============================================================================
// Descriptive metadata
// ============================================================================

fn md_wrap_mods(id: String, mods: Element) -> Element {
    Element::new("mets:dmdSec").attr("ID", id).child(
        Element::new("mets:mdWrap")
            .attr("MDTYPE", "MODS")
            .child(Element::new("mets:xmlData").child(mods)),
    )
}

fn title_info(title: &str) -> Element {
    Element::new("mods:titleInfo").child(Element::with_text("mods:title", title))
}

fn child_dmd_sec(unit: &StructuralUnit) -> Element {
    md_wrap_mods(
        unit.dmd_id(),
        Element::new("mods:mods").child(title_info(&unit.label)),
    )
}

fn root_dmd_sec(doc: &MetsDocument<'_>) -> Element {
    let objects = &doc.metadata.objects;
    let institution = &doc.metadata.institution;
    let unit = doc.unit;

    let mut mods = Element::new("mods:mods");

    if let UnitDates::Issue { date, .. } = &unit.dates {
        mods.push(
            Element::new("mods:part").attr("order", issue_order(*date)).child(
                Element::new("mods:detail")
                    .attr("type", "issue")
                    .child(Element::with_text("mods:number", issue_number(*date))),
            ),
        );
    } else {
        mods.push(
            Element::new("mods:location").child(
                Element::with_text("mods:physicalLocation", institution.name.as_str())
                    .attr("valueURI", format!("{ZDB_ORGANISATIONS}{}", institution.isil)),
            ),
        );
    }

    mods.push(publication_info(doc));
    mods.push(
        Element::new("mods:originInfo")
            .attr("eventType", "digitization")
            .child_opt(objects.place_of_digitization.as_deref().map(place))
            .child(
                Element::with_text("mods:dateCaptured", objects.year_of_digitization.as_str())
                    .attr("encoding", "iso8601"),
            )
            .child(Element::with_text("mods:publisher", institution.name.as_str()))
            .child(Element::with_text("mods:edition", "[Electronic ed.]")),
    );

    if unit.shape == DocumentType::Monograph {
        if let Some(author) = &objects.author {
            mods.push(
                Element::new("mods:name")
                    .attr("type", "personal")
                    .child(Element::with_text("mods:displayForm", author.as_str()))
                    .child(
                        Element::new("mods:role").child(
                            Element::with_text("mods:roleTerm", "aut")
                                .attr("authority", "marcrelator")
                                .attr("type", "code"),
                        ),
                    ),
            );
        }
    }

    if let UnitDates::Issue { zdb_id, .. } = &unit.dates {
        mods.push(
            Element::new("mods:relatedItem")
                .attr("type", "host")
                .child(Element::with_text("mods:identifier", zdb_id.as_str()).attr("type", "zdb"))
                .child(title_info(&objects.title)),
        );
    }

    mods.push(
        Element::new("mods:recordInfo")
            .child(
                Element::with_text("mods:recordIdentifier", record_identifier(doc))
                    .attr("source", institution.isil.as_str()),
            )
            .child(
                Element::with_text("mods:recordCreationDate", doc.timestamp())
                    .attr("encoding", "iso8601"),
            )
            .child(
                Element::with_text("mods:recordInfoNote", institution.license.as_str())
                    .attr("type", "license"),
            ),
    );
    mods.push(title_info(&unit.title));
    mods.push(
        Element::new("mods:language").child(
            Element::with_text("mods:languageTerm", objects.language.as_str())
                .attr("authority", "iso639-2b")
                .attr("type", "code"),
        ),
    );
    mods.push(
        Element::new("mods:physicalDescription")
            .child(Element::with_text("mods:extent", doc.pages.len().to_string())),
    );
    if unit.shape == DocumentType::Newspaper {
        mods.push(
            Element::with_text("mods:genre", "issue").attr("displayLabel", "document type"),
        );
    }
    mods.push(Element::with_text("mods:typeOfResource", "text"));

    md_wrap_mods(doc.root.dmd_id(), mods)
}

fn place(term: &str) -> Element {
    Element::new("mods:place")
        .child(Element::with_text("mods:placeTerm", term).attr("type", "text"))
}

/// `originInfo eventType="publication"`; the issued date depends on shape.
fn publication_info(doc: &MetsDocument<'_>) -> Element {
    let objects = &doc.metadata.objects;
    let date_issued = match &doc.unit.dates {
        UnitDates::Undated => objects
            .date_issued
            .as_deref()
            .map(|d| Element::with_text("mods:dateIssued", d)),
        UnitDates::Volume(volume) => Some(
            Element::with_text("mods:dateIssued", volume.date_issued())
                .attr("encoding", "iso8601")
                .attr("keyDate", "yes"),
        ),
        UnitDates::Issue { date, .. } => Some(
            Element::with_text("mods:dateIssued", date.format("%Y-%m-%d").to_string())
                .attr("encoding", "iso8601")
                .attr("keyDate", "yes"),
        ),
    };

    Element::new("mods:originInfo")
        .attr("eventType", "publication")
        .child_opt(
            objects
                .edition
                .as_deref()
                .map(|e| Element::with_text("mods:edition", e)),
        )
        .child_opt(
            objects
                .publisher
                .as_deref()
                .map(|p| Element::with_text("mods:publisher", p)),
        )
        .child_opt(objects.place_of_publication.as_deref().map(place))
        .child_opt(date_issued)
}

fn record_identifier(doc: &MetsDocument<'_>) -> String {
    let isil = &doc.metadata.institution.isil;
    match &doc.unit.dates {
        UnitDates::Undated => format!("{isil}_{}", doc.unit.title),
        UnitDates::Volume(volume) => format!("{isil}_{}_{}", doc.unit.title, volume.date_issued()),
        UnitDates::Issue { .. } => doc.unit.identifier.clone(),
    }
}

// ============================================================================
// Administrative metadata
// ============================================================================

fn amd_sec(metadata: &Metadata) -> Element {
    let institution = &metadata.institution;
    let rights = Element::new("dv:rights")
        .child(Element::with_text("dv:owner", institution.name.as_str()))
        .child(Element::with_text("dv:ownerLogo", institution.logo_url.as_str()))
        .child(Element::with_text("dv:ownerSiteURL", institution.site_url.as_str()))
        .child(Element::with_text("dv:ownerContact", institution.contact.as_str()))
        .child(Element::with_text("dv:license", institution.license.as_str()))
        .child_opt(
            institution
                .sponsor
                .as_deref()
                .map(|s| Element::with_text("dv:sponsor", s)),
        );

    Element::new("mets:amdSec").attr("ID", AMD_ID).child(
        Element::new("mets:rightsMD").attr("ID", RIGHTS_ID).child(
            Element::new("mets:mdWrap")
                .attr("MDTYPE", "OTHER")
                .attr("MIMETYPE", "text/xml")
                .attr("OTHERMDTYPE", "DVRIGHTS")
                .child(Element::new("mets:xmlData").child(rights)),
        ),
    )
}

// ============================================================================
// Files and structure
// ============================================================================

fn file_sec(doc: &MetsDocument<'_>) -> Element {
    Element::new("mets:fileSec").children(doc.file_roles().into_iter().map(|role| {
        Element::new("mets:fileGrp")
            .attr("USE", role.file_group_use())
            .children(
                file_ids(role, doc.pages.len())
                    .into_iter()
                    .zip(doc.pages)
                    .filter_map(|(id, page)| {
                        let href = doc.href(page, role)?;
                        Some(
                            Element::new("mets:file")
                                .attr("ID", id)
                                .attr("MIMETYPE", role.mime_type())
                                .child(
                                    Element::new("mets:FLocat")
                                        .attr("LOCTYPE", "URL")
                                        .attr("xlink:href", href),
                                ),
                        )
                    }),
            )
    }))
}

fn physical_struct_map(doc: &MetsDocument<'_>) -> Element {
    let roles = doc.file_roles();
    let pages = doc.pages.iter().map(|page| {
        let seq = page.sequence.to_string();
        Element::new("mets:div")
            .attr("TYPE", "page")
            .attr("ID", phys_id(page.sequence))
            .attr("ORDER", seq.as_str())
            .attr("ORDERLABEL", seq.as_str())
            .children(roles.iter().map(|&role| {
                Element::new("mets:fptr").attr("FILEID", file_id(role, page.sequence))
            }))
    });

    Element::new("mets:structMap").attr("TYPE", "PHYSICAL").child(
        Element::new("mets:div")
            .attr("ID", PHYS_SEQUENCE_ID)
            .attr("TYPE", "physSequence")
            .children(pages),
    )
}

fn logical_struct_map(doc: &MetsDocument<'_>) -> Element {
    let root = doc.root;
    let mut div = Element::new("mets:div")
        .attr("ID", root.log_id())
        .attr("DMDID", root.dmd_id())
        .attr("ADMID", AMD_ID)
        .attr("LABEL", doc.unit.root_label())
        .attr("TYPE", doc.unit.logical_type());
    if let Some(date) = doc.unit.issue_date() {
        div = div
            .attr("ORDER", "1")
            .attr("ORDERLABEL", date.format("%Y-%m-%d").to_string());
    }

    let children = root.children.iter().map(|child| {
        Element::new("mets:div")
            .attr("ID", child.log_id())
            .attr("DMDID", child.dmd_id())
            .attr("LABEL", child.label.as_str())
            .attr("TYPE", "chapter")
            .attr_opt("ORDER", child.order.map(|o| o.to_string()))
    });

    Element::new("mets:structMap")
        .attr("TYPE", "LOGICAL")
        .child(div.children(children))
}

fn struct_link(root: &StructuralUnit) -> Element {
    Element::new("mets:structLink").children(struct_links(root).into_iter().map(|link| {
        Element::new("mets:smLink")
            .attr("xlink:from", link.from)
            .attr("xlink:to", link.to)
    }))
}

// ============================================================================
// Consistency
// ============================================================================

/// A cross-reference that does not resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DanglingReference {
    pub attribute: &'static str,
    pub target: String,
}

/// Check that every `FILEID` names exactly one `mets:file`, every
/// `xlink:to` names a physical page div and every `xlink:from` names a
/// logical division.
pub fn verify_references(mets: &Element) -> Result<(), DanglingReference> {
    let mut file_counts: HashMap<&str, usize> = HashMap::new();
    for file in mets.descendants("mets:file") {
        if let Some(id) = file.attribute("ID") {
            *file_counts.entry(id).or_default() += 1;
        }
    }

    let mut physical = HashSet::new();
    let mut logical = HashSet::new();
    for map in mets.descendants("mets:structMap") {
        let ids = match map.attribute("TYPE") {
            Some("PHYSICAL") => &mut physical,
            Some("LOGICAL") => &mut logical,
            _ => continue,
        };
        for div in map.descendants("mets:div") {
            if let Some(id) = div.attribute("ID") {
                ids.insert(id);
            }
        }
    }

    for fptr in mets.descendants("mets:fptr") {
        let target = fptr.attribute("FILEID").unwrap_or_default();
        if file_counts.get(target) != Some(&1) {
            return Err(DanglingReference {
                attribute: "FILEID",
                target: target.to_string(),
            });
        }
    }

    for link in mets.descendants("mets:smLink") {
        for (attribute, ids) in [("xlink:to", &physical), ("xlink:from", &logical)] {
            let target = link.attribute(attribute).unwrap_or_default();
            if !ids.contains(target) {
                return Err(DanglingReference {
                    attribute,
                    target: target.to_string(),
                });
            }
        }
    }

    Ok(())
}

impl std::fmt::Display for DanglingReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} '{}' does not resolve", self.attribute, self.target)
    }
}
