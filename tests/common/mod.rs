//! In-memory PDF fixtures shared by the integration tests

#![allow(dead_code)]

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

/// Builds small PDFs page by page.
///
/// Every page carries a `/Marker` entry holding its 1-based number, so tests
/// can tell pages apart after they have been reordered or copied.
pub struct PdfBuilder {
    pages: usize,
    shared_image: Option<(u32, u32)>,
    image_per_page: Option<(u32, u32)>,
    inherited_media_box: bool,
    deflate: bool,
    shared_image_form: Option<FormUse>,
}

/// How pages reach the shared image once it is wrapped in a Form XObject
#[derive(Clone, Copy)]
pub enum FormUse {
    /// Only through the form
    FormOnly,
    /// Through the form and through a direct reference
    FormAndDirect,
}

impl PdfBuilder {
    pub fn new(pages: usize) -> Self {
        Self {
            pages,
            shared_image: None,
            image_per_page: None,
            inherited_media_box: false,
            deflate: false,
            shared_image_form: None,
        }
    }

    /// One raw RGB image drawn on every page
    pub fn shared_image(mut self, width: u32, height: u32) -> Self {
        self.shared_image = Some((width, height));
        self
    }

    /// A distinct raw RGB image on each page
    pub fn image_per_page(mut self, width: u32, height: u32) -> Self {
        self.image_per_page = Some((width, height));
        self
    }

    /// Put the MediaBox on the page tree root instead of on each page
    pub fn inherited_media_box(mut self) -> Self {
        self.inherited_media_box = true;
        self
    }

    /// Draw the shared image from inside a Form XObject
    pub fn shared_image_in_form(mut self, form_use: FormUse) -> Self {
        self.shared_image_form = Some(form_use);
        self
    }

    /// Flate-compress all streams before saving
    pub fn deflate(mut self) -> Self {
        self.deflate = true;
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let shared = self
            .shared_image
            .map(|(w, h)| doc.add_object(raw_rgb_image(w, h, 0)));
        let form = match (shared, self.shared_image_form) {
            (Some(image_id), Some(_)) => Some(doc.add_object(form_wrapping(image_id))),
            _ => None,
        };
        let draw_shared_directly = !matches!(self.shared_image_form, Some(FormUse::FormOnly));

        let mut kids = Vec::with_capacity(self.pages);
        for number in 1..=self.pages {
            let mut xobjects = Dictionary::new();
            let mut content = String::from("0 0 m 100 100 l S\n");

            if let Some(id) = shared.filter(|_| draw_shared_directly) {
                xobjects.set("ImShared", Object::Reference(id));
                content.push_str("q 400 0 0 300 50 400 cm /ImShared Do Q\n");
            }
            if let Some(id) = form {
                xobjects.set("FmShared", Object::Reference(id));
                content.push_str("q 1 0 0 1 300 50 cm /FmShared Do Q\n");
            }
            if let Some((w, h)) = self.image_per_page {
                let id = doc.add_object(raw_rgb_image(w, h, number as u32));
                xobjects.set("ImPage", Object::Reference(id));
                content.push_str("q 200 0 0 150 50 50 cm /ImPage Do Q\n");
            }

            let content_id = doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));

            let mut page = Dictionary::new();
            page.set("Type", Object::Name(b"Page".to_vec()));
            page.set("Parent", Object::Reference(pages_id));
            page.set("Contents", Object::Reference(content_id));
            page.set("Marker", Object::Integer(number as i64));
            page.set(
                "Resources",
                Object::Dictionary(Dictionary::from_iter(vec![(
                    "XObject",
                    Object::Dictionary(xobjects),
                )])),
            );
            if !self.inherited_media_box {
                page.set("MediaBox", media_box());
            }
            kids.push(Object::Reference(doc.add_object(page)));
        }

        let mut pages = Dictionary::new();
        pages.set("Type", Object::Name(b"Pages".to_vec()));
        pages.set("Count", Object::Integer(kids.len() as i64));
        pages.set("Kids", Object::Array(kids));
        if self.inherited_media_box {
            pages.set("MediaBox", media_box());
        }
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let catalog_id = doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(pages_id)),
        ]));
        doc.trailer.set("Root", Object::Reference(catalog_id));

        if self.deflate {
            doc.compress();
        }

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).expect("fixture saves");
        bytes
    }
}

fn form_wrapping(image_id: ObjectId) -> Stream {
    let mut dict = Dictionary::new();
    dict.set("Type", Object::Name(b"XObject".to_vec()));
    dict.set("Subtype", Object::Name(b"Form".to_vec()));
    dict.set(
        "BBox",
        Object::Array(vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(200),
            Object::Integer(150),
        ]),
    );
    dict.set(
        "Resources",
        Object::Dictionary(Dictionary::from_iter(vec![(
            "XObject",
            Object::Dictionary(Dictionary::from_iter(vec![(
                "ImInner",
                Object::Reference(image_id),
            )])),
        )])),
    );
    Stream::new(dict, b"q 200 0 0 150 0 0 cm /ImInner Do Q".to_vec())
}

fn media_box() -> Object {
    Object::Array(vec![
        Object::Integer(0),
        Object::Integer(0),
        Object::Integer(612),
        Object::Integer(792),
    ])
}

/// Smooth gradient, shifted by `seed` so every seed gives distinct bytes
pub fn raw_rgb_image(width: u32, height: u32, seed: u32) -> Stream {
    let mut content = Vec::with_capacity(width as usize * height as usize * 3);
    for y in 0..height {
        for x in 0..width {
            content.push((x * 255 / width.max(1)) as u8);
            content.push((y * 255 / height.max(1)) as u8);
            content.push(((x + y + seed * 17) % 256) as u8);
        }
    }

    let mut dict = Dictionary::new();
    dict.set("Type", Object::Name(b"XObject".to_vec()));
    dict.set("Subtype", Object::Name(b"Image".to_vec()));
    dict.set("Width", Object::Integer(width as i64));
    dict.set("Height", Object::Integer(height as i64));
    dict.set("ColorSpace", Object::Name(b"DeviceRGB".to_vec()));
    dict.set("BitsPerComponent", Object::Integer(8));
    Stream::new(dict, content)
}

pub fn load(bytes: &[u8]) -> Document {
    Document::load_mem(bytes).expect("output is a readable PDF")
}

/// `/Marker` of every page, in page order
pub fn page_markers(bytes: &[u8]) -> Vec<i64> {
    let doc = load(bytes);
    doc.get_pages()
        .into_values()
        .map(|id| {
            doc.get_dictionary(id)
                .and_then(|page| page.get(b"Marker"))
                .and_then(Object::as_i64)
                .expect("page has a marker")
        })
        .collect()
}

/// Image XObject streams left in the document
pub fn image_streams(doc: &Document) -> Vec<(ObjectId, &Stream)> {
    doc.objects
        .iter()
        .filter_map(|(id, object)| match object {
            Object::Stream(stream)
                if matches!(
                    stream.dict.get(b"Subtype"),
                    Ok(Object::Name(n)) if n == b"Image"
                ) =>
            {
                Some((*id, stream))
            }
            _ => None,
        })
        .collect()
}

/// Stream data with any Flate layer removed
pub fn stream_bytes(stream: &Stream) -> Vec<u8> {
    if stream.dict.has(b"Filter") {
        stream
            .decompressed_content()
            .expect("fixture streams decompress")
    } else {
        stream.content.clone()
    }
}
