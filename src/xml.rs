// src/xml.rs

//! Small helpers over quick-xml shared by the settings, descriptor and POM readers

use crate::error::{Error, Result};
use quick_xml::events::BytesStart;
use std::collections::HashMap;

/// Collect the attributes of an element into a map, unescaping values
pub(crate) fn attributes(element: &BytesStart<'_>) -> Result<HashMap<String, String>> {
    let mut map = HashMap::new();
    for attr in element.attributes() {
        let attr = attr.map_err(|e| Error::ParseError(format!("Invalid XML attribute: {e}")))?;
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| Error::ParseError(format!("Invalid value for '{key}': {e}")))?
            .into_owned();
        map.insert(key, value);
    }
    Ok(map)
}

/// Local (namespace-less) name of an element
pub(crate) fn local_name(element: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(element.local_name().as_ref()).into_owned()
}
