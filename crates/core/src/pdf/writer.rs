use std::collections::HashMap;
use std::path::Path;

use lopdf::{Dictionary, Document, Object, ObjectId};
use regex::Regex;

use crate::error::{CoreError, CoreResult};

/// Maps a raster image's PDF xref to the alt-text that should be attached
/// to it. Entries with a synthetic xref (see `ImageDescriptor::is_synthetic`)
/// must already be filtered out by the caller — the writer has no PDF
/// object to attach them to.
pub type AltTextMap = HashMap<u32, String>;

struct PageFigure {
    mcid: u32,
    resource_name: String,
    struct_elem_id: ObjectId,
}

/// Build a tagged copy of `source_path` at `output_path`, attaching each
/// mapped image's alt-text via a full structure tree plus a direct `/Alt`
/// fallback on the image XObject. Writes to a temp file in the same
/// directory first, then renames — the output path never observes a
/// partially-written file.
pub fn write_tagged_pdf(
    source_path: &Path,
    output_path: &Path,
    alt_texts: &AltTextMap,
) -> CoreResult<()> {
    let mut doc = Document::load(source_path)
        .map_err(|e| CoreError::Writer(format!("failed to open source PDF: {e}")))?;

    let pages = doc.get_pages();
    let mut any_mappable = false;

    // Step 2: set /Alt directly on every mapped image XObject (fallback path)
    // and remember which (page, name, xref) triples are mappable.
    let mut page_figures: HashMap<ObjectId, Vec<(u32, String)>> = HashMap::new(); // page_id -> [(xref, name)]

    for (_page_num, page_id) in pages.iter() {
        let Ok((Some(resources), _)) = doc.get_page_resources(*page_id).map(|r| (r.0.cloned(), r.1)) else {
            continue;
        };
        let Some(xobjects) = resources.get(b"XObject").ok().and_then(|o| o.as_dict().ok()).cloned() else {
            continue;
        };
        for (name, obj_ref) in xobjects.iter() {
            let Ok(obj_id) = obj_ref.as_reference() else {
                continue;
            };
            let Some(alt) = alt_texts.get(&obj_id.0) else {
                continue;
            };
            any_mappable = true;
            page_figures
                .entry(*page_id)
                .or_default()
                .push((obj_id.0, String::from_utf8_lossy(name).to_string()));

            if let Ok(stream_obj) = doc.get_object_mut(obj_id) {
                if let Ok(stream) = stream_obj.as_stream_mut() {
                    stream
                        .dict
                        .set("Alt", Object::string_literal(escape_pdf_string(alt)));
                }
            }
        }
    }

    if !any_mappable {
        return atomic_save(&mut doc, output_path);
    }

    // Steps 4-8: allocate the structure tree.
    let struct_tree_root_id = doc.new_object_id();
    let parent_tree_id = doc.new_object_id();
    let document_elem_id = doc.new_object_id();

    let mut document_kids: Vec<Object> = Vec::new();
    let mut nums: Vec<(u32, ObjectId)> = Vec::new(); // page index -> array object holding that page's figure refs

    for (page_idx, (_page_num, page_id)) in pages.iter().enumerate() {
        let Some(figures_on_page) = page_figures.get(page_id) else {
            continue;
        };

        let mut figure_elems = Vec::new();
        for (mcid, (_xref, name)) in figures_on_page.iter().enumerate() {
            let alt = alt_texts
                .get(&figures_on_page[mcid].0)
                .cloned()
                .unwrap_or_default();

            let mut fig_dict = Dictionary::new();
            fig_dict.set("Type", Object::Name(b"StructElem".to_vec()));
            fig_dict.set("S", Object::Name(b"Figure".to_vec()));
            fig_dict.set("P", Object::Reference(document_elem_id));
            fig_dict.set("Pg", Object::Reference(*page_id));
            fig_dict.set("Alt", Object::string_literal(escape_pdf_string(&alt)));

            let mut mcr = Dictionary::new();
            mcr.set("Type", Object::Name(b"MCR".to_vec()));
            mcr.set("MCID", Object::Integer(mcid as i64));
            mcr.set("Pg", Object::Reference(*page_id));
            fig_dict.set("K", Object::Dictionary(mcr));

            let fig_id = doc.add_object(Object::Dictionary(fig_dict));
            document_kids.push(Object::Reference(fig_id));
            figure_elems.push(PageFigure {
                mcid: mcid as u32,
                resource_name: name.clone(),
                struct_elem_id: fig_id,
            });
        }

        // Step 7: populate this page's entry in the parent tree's /Nums.
        let refs: Vec<Object> = figure_elems
            .iter()
            .map(|f| Object::Reference(f.struct_elem_id))
            .collect();
        let nums_array_id = doc.add_object(Object::Array(refs));
        nums.push((page_idx as u32 + 1, nums_array_id));

        // Step 9: rewrite the page's content stream with BDC/EMC wrapping.
        rewrite_page_content(&mut doc, *page_id, &figure_elems)?;

        // Step 9 (cont.): set /StructParents on the page.
        if let Ok(page_obj) = doc.get_object_mut(*page_id) {
            if let Ok(page_dict) = page_obj.as_dict_mut() {
                page_dict.set("StructParents", Object::Integer(page_idx as i64));
            }
        }
    }

    // Step 6: document struct elem's /K.
    let mut document_dict = Dictionary::new();
    document_dict.set("Type", Object::Name(b"StructElem".to_vec()));
    document_dict.set("S", Object::Name(b"Document".to_vec()));
    document_dict.set("P", Object::Reference(struct_tree_root_id));
    document_dict.set("K", Object::Array(document_kids));
    doc.objects
        .insert(document_elem_id, Object::Dictionary(document_dict));

    // Step 4/5: struct tree root.
    let mut str_root_dict = Dictionary::new();
    str_root_dict.set("Type", Object::Name(b"StructTreeRoot".to_vec()));
    str_root_dict.set("K", Object::Reference(document_elem_id));
    str_root_dict.set("ParentTree", Object::Reference(parent_tree_id));
    doc.objects
        .insert(struct_tree_root_id, Object::Dictionary(str_root_dict));

    let mut nums_flat = Vec::new();
    for (page_num, arr_id) in &nums {
        nums_flat.push(Object::Integer(*page_num as i64 - 1));
        nums_flat.push(Object::Reference(*arr_id));
    }
    let mut parent_tree_dict = Dictionary::new();
    parent_tree_dict.set("Nums", Object::Array(nums_flat));
    doc.objects
        .insert(parent_tree_id, Object::Dictionary(parent_tree_dict));

    // Step 8: catalog updates.
    let catalog_id = doc
        .trailer
        .get(b"Root")
        .ok()
        .and_then(|o| o.as_reference().ok())
        .ok_or_else(|| CoreError::Writer("document has no catalog".to_string()))?;
    if let Ok(catalog_obj) = doc.get_object_mut(catalog_id) {
        if let Ok(catalog) = catalog_obj.as_dict_mut() {
            catalog.set("StructTreeRoot", Object::Reference(struct_tree_root_id));
            let mut mark_info = Dictionary::new();
            mark_info.set("Marked", Object::Boolean(true));
            catalog.set("MarkInfo", Object::Dictionary(mark_info));
        }
    }

    atomic_save(&mut doc, output_path)
}

/// Find each figure's `q ... /Name Do Q` run in the page's decoded content
/// stream and wrap it as `/Figure <</MCID n>> BDC ... EMC`.
fn rewrite_page_content(
    doc: &mut Document,
    page_id: ObjectId,
    figures: &[PageFigure],
) -> CoreResult<()> {
    let content_bytes = doc
        .get_page_content(page_id)
        .map_err(|e| CoreError::Writer(format!("failed to read page content: {e}")))?;
    // Content streams are binary-safe Latin-1, not UTF-8 — decode
    // unconditionally byte-to-char so the later re-encode round-trips.
    let mut content: String = content_bytes.iter().map(|&b| b as char).collect();

    for figure in figures {
        let escaped_name = regex::escape(&figure.resource_name);
        let pattern = format!(r"q\s[^Q]*?/{escaped_name}\s+Do\s*Q");
        let re = Regex::new(&pattern)
            .map_err(|e| CoreError::Writer(format!("invalid content-stream pattern: {e}")))?;

        if let Some(m) = re.find(&content) {
            let original = m.as_str().to_string();
            let wrapped = format!(
                "/Figure <</MCID {}>> BDC\n{original}\nEMC",
                figure.mcid
            );
            content.replace_range(m.range(), &wrapped);
        }
        // If not found, the page is left untagged for this image rather
        // than risking a corrupted stream — logged by the caller.
    }

    let new_bytes: Vec<u8> = content.chars().map(|c| c as u8).collect();
    doc.change_page_content(page_id, new_bytes)
        .map_err(|e| CoreError::Writer(format!("failed to rewrite page content: {e}")))
}

/// Escape `\`, `(`, `)` for a PDF literal string.
fn escape_pdf_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '(' => out.push_str("\\("),
            ')' => out.push_str("\\)"),
            other => out.push(other),
        }
    }
    out
}

fn atomic_save(doc: &mut Document, output_path: &Path) -> CoreResult<()> {
    let dir = output_path
        .parent()
        .ok_or_else(|| CoreError::Writer("output path has no parent directory".to_string()))?;
    let tmp_path = dir.join(format!(
        ".{}.tmp",
        output_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("tagged")
    ));

    doc.save(&tmp_path)
        .map_err(|e| CoreError::Writer(format!("failed to save PDF: {e}")))?;
    std::fs::rename(&tmp_path, output_path)
        .map_err(|e| CoreError::Writer(format!("failed to finalize output file: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdf_string_escaping() {
        assert_eq!(escape_pdf_string("a (b) c\\d"), "a \\(b\\) c\\\\d");
        assert_eq!(escape_pdf_string("plain text"), "plain text");
    }
}
