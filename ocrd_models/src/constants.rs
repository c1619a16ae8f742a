//! Namespaces, identifier priorities and the empty METS template.

pub const NS_METS: &str = "http://www.loc.gov/METS/";
pub const NS_MODS: &str = "http://www.loc.gov/mods/v3";
pub const NS_XLINK: &str = "http://www.w3.org/1999/xlink";
pub const NS_XSI: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// Every PAGE-XML schema version lives below this URI.
pub const NS_PAGE_PREFIX: &str = "http://schema.primaresearch.org/PAGE/gts/pagecontent/";
pub const NS_PAGE_2019: &str = "http://schema.primaresearch.org/PAGE/gts/pagecontent/2019-07-15";

/// `mods:identifier/@type` values, most preferred first.
pub const IDENTIFIER_PRIORITY: &[&str] = &["purl", "urn", "doi", "url"];

/// Template for new METS documents. `{{ VERSION }}` and `{{ NOW }}` are
/// substituted on creation.
pub const METS_XML_EMPTY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<mets:mets xmlns:mets="http://www.loc.gov/METS/" xmlns:mods="http://www.loc.gov/mods/v3" xmlns:xlink="http://www.w3.org/1999/xlink" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:schemaLocation="info:lc/xmlns/premis-v2 http://www.loc.gov/standards/premis/v2/premis-v2-0.xsd http://www.loc.gov/mods/v3 http://www.loc.gov/standards/mods/v3/mods-3-6.xsd http://www.loc.gov/METS/ http://www.loc.gov/standards/mets/version17/mets.v1-7.xsd http://www.w3.org/1999/xlink http://www.loc.gov/standards/xlink/xlink.xsd">
  <mets:metsHdr CREATEDATE="{{ NOW }}">
    <mets:agent TYPE="OTHER" OTHERTYPE="SOFTWARE" ROLE="CREATOR">
      <mets:name>ocrd/core v{{ VERSION }}</mets:name>
    </mets:agent>
  </mets:metsHdr>
  <mets:dmdSec ID="DMDLOG_0001">
    <mets:mdWrap MDTYPE="MODS">
      <mets:xmlData>
        <mods:mods>
        </mods:mods>
      </mets:xmlData>
    </mets:mdWrap>
  </mets:dmdSec>
  <mets:amdSec ID="AMD">
  </mets:amdSec>
  <mets:fileSec>
  </mets:fileSec>
  <mets:structMap TYPE="PHYSICAL">
    <mets:div TYPE="physSequence">
    </mets:div>
  </mets:structMap>
</mets:mets>
"#;
