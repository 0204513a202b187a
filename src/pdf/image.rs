use std::io::Cursor;
use lopdf::{Object, Stream};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use shield_core::{ImageProfile, Rect};

/// 图片内的待清除区域，坐标为 0-1 的比例（左上角原点）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelMask {
  pub x: f32,
  pub y: f32,
  pub width: f32,
  pub height: f32,
}

impl PixelMask {
  /// 页面上的覆盖区域换算为图片内比例；不相交时返回 None
  pub fn from_placement(placement: &Rect, area: &Rect) -> Option<Self> {
    let overlap = placement.intersection(area)?;
    let w = placement.width();
    let h = placement.height();
    if w <= 0.0 || h <= 0.0 {
      return None;
    }
    Some(Self {
      x: (overlap.x0 - placement.x0) / w,
      y: (overlap.y0 - placement.y0) / h,
      width: overlap.width() / w,
      height: overlap.height() / h,
    })
  }
}

/// 在图片上填充白色矩形
fn paint_white_rectangles(img: &mut RgbaImage, masks: &[PixelMask]) {
  let (img_width, img_height) = img.dimensions();
  let white = Rgba([255u8, 255u8, 255u8, 255u8]);

  for mask in masks {
    let x_start = (mask.x * img_width as f32).floor().max(0.0) as u32;
    let y_start = (mask.y * img_height as f32).floor().max(0.0) as u32;
    let x_end = (((mask.x + mask.width) * img_width as f32).ceil() as u32).min(img_width);
    let y_end = (((mask.y + mask.height) * img_height as f32).ceil() as u32).min(img_height);

    for y in y_start..y_end {
      for x in x_start..x_end {
        img.put_pixel(x, y, white);
      }
    }
  }
}

fn dict_integer(stream: &Stream, key: &[u8]) -> Option<i64> {
  match stream.dict.get(key) {
    Ok(Object::Integer(v)) => Some(*v),
    _ => None,
  }
}

/// 解码图片 XObject：8 位 RGB / 灰度原始数据，或 image 能识别的格式（JPEG 等）
pub fn decode_image(stream: &Stream) -> Option<RgbaImage> {
  let width = dict_integer(stream, b"Width").filter(|w| *w > 0)? as u32;
  let height = dict_integer(stream, b"Height").filter(|h| *h > 0)? as u32;

  let filter = stream.dict.get(b"Filter");
  let is_jpeg = matches!(filter, Ok(Object::Name(n)) if n == b"DCTDecode");

  let image_data = if is_jpeg {
    stream.content.clone()
  } else {
    match stream.decompressed_content() {
      Ok(data) => data,
      Err(_) => stream.content.clone(),
    }
  };

  let bits_per_component = dict_integer(stream, b"BitsPerComponent").unwrap_or(8);

  let color_space = stream.dict.get(b"ColorSpace");
  let is_rgb = matches!(color_space, Ok(Object::Name(n)) if n == b"DeviceRGB");
  let is_gray = matches!(color_space, Ok(Object::Name(n)) if n == b"DeviceGray");
  let pixels = width as usize * height as usize;

  if !is_jpeg && is_rgb && bits_per_component == 8 && image_data.len() == pixels * 3 {
    let mut img = RgbaImage::new(width, height);
    for (i, pixel) in image_data.chunks(3).enumerate() {
      let x = (i as u32) % width;
      let y = (i as u32) / width;
      img.put_pixel(x, y, Rgba([pixel[0], pixel[1], pixel[2], 255]));
    }
    return Some(img);
  }

  if !is_jpeg && is_gray && bits_per_component == 8 && image_data.len() == pixels {
    let mut img = RgbaImage::new(width, height);
    for (i, &gray) in image_data.iter().enumerate() {
      let x = (i as u32) % width;
      let y = (i as u32) / width;
      img.put_pixel(x, y, Rgba([gray, gray, gray, 255]));
    }
    return Some(img);
  }

  match image::load_from_memory(&image_data) {
    Ok(img) => Some(img.to_rgba8()),
    Err(e) => {
      log::debug!("[Image] 无法解码图片 ({}x{}): {}", width, height, e);
      None
    }
  }
}

/// 图片像素特征：尺寸与亮度 > 240 的像素占比
pub fn profile_image(stream: &Stream) -> Option<ImageProfile> {
  let img = decode_image(stream)?;
  let (width, height) = img.dimensions();
  let total = width as u64 * height as u64;
  if total == 0 {
    return None;
  }

  let white = img
    .pixels()
    .filter(|p| {
      let [r, g, b, _] = p.0;
      let luma = 0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32;
      luma > 240.0
    })
    .count() as u64;

  Some(ImageProfile {
    pixel_width: width,
    pixel_height: height,
    white_ratio: white as f32 / total as f32,
  })
}

/// 把图片中被覆盖的区域改为白色，返回新的图片流；无法解码时返回 None
pub fn blank_image_regions(stream: &Stream, masks: &[PixelMask]) -> Result<Option<Stream>, String> {
  let mut rgba_img = match decode_image(stream) {
    Some(img) => img,
    None => return Ok(None),
  };

  paint_white_rectangles(&mut rgba_img, masks);

  let filter = stream.dict.get(b"Filter");
  let use_jpeg = matches!(filter, Ok(Object::Name(n)) if n == b"DCTDecode");

  let rgb_img = DynamicImage::ImageRgba8(rgba_img).to_rgb8();
  let output_data = if use_jpeg {
    let mut data = Vec::new();
    rgb_img
      .write_to(&mut Cursor::new(&mut data), ImageFormat::Jpeg)
      .map_err(|e| e.to_string())?;
    data
  } else {
    rgb_img.into_raw()
  };

  let mut new_dict = stream.dict.clone();
  if !use_jpeg {
    new_dict.remove(b"Filter");
    new_dict.remove(b"DecodeParms");
  }
  new_dict.remove(b"Decode");
  new_dict.set("ColorSpace", Object::Name(b"DeviceRGB".to_vec()));
  new_dict.set("BitsPerComponent", Object::Integer(8));
  new_dict.set("Length", Object::Integer(output_data.len() as i64));

  let new_stream = if use_jpeg {
    Stream::new(new_dict, output_data)
  } else {
    let mut s = Stream::new(new_dict, output_data);
    s.compress().ok();
    s
  };

  Ok(Some(new_stream))
}
