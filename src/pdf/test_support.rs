//! 测试用的内存 PDF 构造

use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};

/// 8 位灰度图片流，所有像素取同一值
pub fn gray_image(width: i64, height: i64, value: u8) -> Stream {
  Stream::new(
    dictionary! {
      "Type" => "XObject",
      "Subtype" => "Image",
      "Width" => width,
      "Height" => height,
      "ColorSpace" => "DeviceGray",
      "BitsPerComponent" => 8,
    },
    vec![value; (width * height) as usize],
  )
}

/// 整页大小的表单 XObject；`xobjects` 非空时写入表单自己的 Resources，否则沿用页面资源
pub fn form_xobject(content: &str, xobjects: &[(&str, ObjectId)]) -> Stream {
  let mut dict = dictionary! {
    "Type" => "XObject",
    "Subtype" => "Form",
    "BBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
  };
  if !xobjects.is_empty() {
    let mut entries = Dictionary::new();
    for (name, id) in xobjects {
      entries.set(name.as_bytes().to_vec(), Object::Reference(*id));
    }
    dict.set("Resources", dictionary! { "XObject" => entries });
  }
  Stream::new(dict, content.as_bytes().to_vec())
}

/// 在所有页共享的资源字典中登记一个已有对象
pub fn register_xobject_id(doc: &mut Document, name: &str, id: ObjectId) {
  let page_id = doc.get_pages()[&1];
  let resources_id = match doc.get_dictionary(page_id).and_then(|page| page.get(b"Resources")) {
    Ok(Object::Reference(id)) => *id,
    other => panic!("Resources 不是引用: {:?}", other),
  };
  let resources = doc.get_object_mut(resources_id).and_then(Object::as_dict_mut).unwrap();
  match resources.get_mut(b"XObject") {
    Ok(Object::Dictionary(xobjects)) => xobjects.set(name.as_bytes().to_vec(), Object::Reference(id)),
    other => panic!("XObject 不是字典: {:?}", other),
  }
}

/// 加入新的 XObject 并登记到共享资源字典
pub fn register_xobject(doc: &mut Document, name: &str, stream: Stream) -> ObjectId {
  let id = doc.add_object(stream);
  register_xobject_id(doc, name, id);
  id
}

fn helvetica() -> Dictionary {
  dictionary! {
    "Type" => "Font",
    "Subtype" => "Type1",
    "BaseFont" => "Helvetica",
    "Encoding" => "WinAnsiEncoding",
  }
}

/// 多页 Letter 文档；每页一个内容流，图片资源所有页共享
pub fn multi_page_doc(contents: &[&str], images: Vec<(&str, Stream)>) -> Document {
  let mut doc = Document::with_version("1.5");
  let pages_id = doc.new_object_id();
  let font_id = doc.add_object(helvetica());

  let mut xobjects = Dictionary::new();
  for (name, stream) in images {
    let id = doc.add_object(stream);
    xobjects.set(name.as_bytes().to_vec(), Object::Reference(id));
  }

  let resources_id = doc.add_object(dictionary! {
    "Font" => dictionary! { "F1" => font_id },
    "XObject" => xobjects,
  });

  let mut kids: Vec<Object> = Vec::new();
  for content in contents {
    let content_id = doc.add_object(Stream::new(Dictionary::new(), content.as_bytes().to_vec()));
    let page_id = doc.add_object(dictionary! {
      "Type" => "Page",
      "Parent" => pages_id,
      "Contents" => content_id,
      "Resources" => resources_id,
    });
    kids.push(page_id.into());
  }

  let count = kids.len() as i64;
  doc.objects.insert(
    pages_id,
    Object::Dictionary(dictionary! {
      "Type" => "Pages",
      "Kids" => kids,
      "Count" => count,
      "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
    }),
  );

  let catalog_id = doc.add_object(dictionary! {
    "Type" => "Catalog",
    "Pages" => pages_id,
  });
  doc.trailer.set("Root", catalog_id);
  doc
}

pub fn single_page_doc(content: &str, images: Vec<(&str, Stream)>) -> Document {
  multi_page_doc(&[content], images)
}

/// 保存为字节
pub fn to_bytes(doc: &mut Document) -> Vec<u8> {
  let mut bytes = Vec::new();
  doc.save_to(&mut bytes).unwrap();
  bytes
}
