use lopdf::{Document, Object, StringFormat};

/// 品牌信息配置
pub struct BrandInfo {
    pub name: &'static str,
    pub version: &'static str,
}

/// 默认品牌信息
pub const BRAND: BrandInfo = BrandInfo {
    name: "Data Shield",
    version: env!("CARGO_PKG_VERSION"),
};

fn literal(value: &str) -> Object {
    Object::String(value.as_bytes().to_vec(), StringFormat::Literal)
}

/// 设置脱敏工具的元信息
///
/// 在 Info 字典中添加工具标识、处理时间和已脱敏标记
pub fn set_redaction_metadata(doc: &mut Document) -> Result<(), lopdf::Error> {
    use chrono::Local;

    // 获取或创建 Info 字典
    let info_id = match doc.trailer.get(b"Info") {
        Ok(Object::Reference(id)) => *id,
        _ => {
            let new_id = doc.add_object(Object::Dictionary(lopdf::Dictionary::new()));
            doc.trailer.set("Info", Object::Reference(new_id));
            new_id
        }
    };

    // PDF 日期格式 D:YYYYMMDDHHmmSS
    let now = Local::now();
    let pdf_date = format!("D:{}", now.format("%Y%m%d%H%M%S"));
    let producer = format!("{} v{}", BRAND.name, BRAND.version);

    let info_dict = doc.get_object_mut(info_id).and_then(Object::as_dict_mut)?;
    info_dict.set("Producer", literal(&producer));
    info_dict.set("ModDate", literal(&pdf_date));
    info_dict.set("Redacted", literal("true"));
    info_dict.set("RedactedBy", literal(&producer));

    log::info!("[Metadata] Producer={}, ModDate={}", producer, pdf_date);
    Ok(())
}
