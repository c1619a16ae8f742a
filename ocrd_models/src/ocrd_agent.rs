use crate::{
    constants::NS_METS,
    xml::{Element, XmlDocument},
};
use std::fmt;

/// A `mets:agent` in the METS header: who or what worked on the document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OcrdAgent {
    pub role: Option<String>,
    pub otherrole: Option<String>,
    pub agent_type: Option<String>,
    pub othertype: Option<String>,
    pub name: Option<String>,
    pub notes: Vec<String>,
}

impl OcrdAgent {
    /// A software agent with role `OTHER`, as processors register themselves.
    pub fn software(name: impl Into<String>, otherrole: impl Into<String>) -> Self {
        Self {
            role: Some("OTHER".to_string()),
            otherrole: Some(otherrole.into()),
            agent_type: Some("OTHER".to_string()),
            othertype: Some("SOFTWARE".to_string()),
            name: Some(name.into()),
            notes: Vec::new(),
        }
    }

    pub fn from_element(el: &Element) -> Self {
        Self {
            role: el.attr("ROLE").map(str::to_string),
            otherrole: el.attr("OTHERROLE").map(str::to_string),
            agent_type: el.attr("TYPE").map(str::to_string),
            othertype: el.attr("OTHERTYPE").map(str::to_string),
            name: el.find(NS_METS, "name").map(Element::text),
            notes: el.find_all(NS_METS, "note").map(Element::text).collect(),
        }
    }

    pub(crate) fn to_element(&self, doc: &mut XmlDocument) -> Element {
        let mut el = doc.create_element(NS_METS, "mets", "agent");
        for (key, value) in [
            ("TYPE", &self.agent_type),
            ("OTHERTYPE", &self.othertype),
            ("ROLE", &self.role),
            ("OTHERROLE", &self.otherrole),
        ] {
            if let Some(value) = value {
                el.set_attr(key, value.as_str());
            }
        }
        if let Some(name) = &self.name {
            el.append(doc.create_element(NS_METS, "mets", "name"))
                .set_text(name.as_str());
        }
        for note in &self.notes {
            el.append(doc.create_element(NS_METS, "mets", "note"))
                .set_text(note.as_str());
        }
        el
    }
}

impl fmt::Display for OcrdAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let role = match (&self.role, &self.otherrole) {
            (Some(r), Some(o)) if r == "OTHER" => o.as_str(),
            (Some(r), _) => r.as_str(),
            (None, _) => "",
        };
        let kind = match (&self.agent_type, &self.othertype) {
            (Some(t), Some(o)) if t == "OTHER" => o.as_str(),
            (Some(t), _) => t.as_str(),
            (None, _) => "",
        };
        write!(
            f,
            "OcrdAgent[type={kind},role={role},name={}]",
            self.name.as_deref().unwrap_or("")
        )
    }
}
