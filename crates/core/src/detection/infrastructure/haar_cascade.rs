/// Viola-Jones Haar cascade face engine.
///
/// Reads cascades in the OpenCV XML format, scans a luminance pyramid with
/// the cascade's base window, and merges raw hits with neighbor grouping.
use std::borrow::Cow;
use std::fs;
use std::path::Path;

use image::imageops::FilterType;
use image::GrayImage;

use crate::detection::domain::face_locator::{DetectorParams, FaceEngine};
use crate::shared::bounding_box::Rect;
use crate::shared::model_resolver::ModelLoadError;

use super::integral_image::IntegralImage;
use super::rect_grouping::{group_rectangles, GROUP_EPS};

#[derive(Debug, Clone, Copy)]
struct WeightedRect {
    x: usize,
    y: usize,
    width: usize,
    height: usize,
    weight: f64,
}

#[derive(Debug, Clone)]
struct HaarFeature {
    rects: Vec<WeightedRect>,
}

impl HaarFeature {
    fn value(&self, ii: &IntegralImage, ox: usize, oy: usize) -> f64 {
        self.rects
            .iter()
            .map(|r| r.weight * ii.rect_sum(ox + r.x, oy + r.y, r.width, r.height) as f64)
            .sum()
    }
}

/// Split node: `value < threshold` goes left. Child indices `<= 0` name
/// leaves (`-index`), positive ones name later nodes.
#[derive(Debug, Clone, Copy)]
struct Node {
    left: i32,
    right: i32,
    feature: usize,
    threshold: f64,
}

#[derive(Debug, Clone)]
struct WeakTree {
    nodes: Vec<Node>,
    leaves: Vec<f64>,
}

impl WeakTree {
    fn predict(&self, feature_value: impl Fn(usize) -> f64) -> f64 {
        let mut idx = 0i32;
        loop {
            let node = &self.nodes[idx as usize];
            idx = if feature_value(node.feature) < node.threshold {
                node.left
            } else {
                node.right
            };
            if idx <= 0 {
                return self.leaves[(-idx) as usize];
            }
        }
    }
}

#[derive(Debug, Clone)]
struct Stage {
    threshold: f64,
    trees: Vec<WeakTree>,
}

/// A boosted Haar cascade with a fixed base window.
#[derive(Debug, Clone)]
pub struct HaarCascade {
    window_width: u32,
    window_height: u32,
    stages: Vec<Stage>,
    features: Vec<HaarFeature>,
}

impl HaarCascade {
    pub fn load(path: &Path) -> Result<Self, ModelLoadError> {
        let cascade_err = |message: String| ModelLoadError::Cascade {
            path: path.to_path_buf(),
            message,
        };
        let xml = fs::read_to_string(path).map_err(|e| cascade_err(e.to_string()))?;
        Self::from_xml(&xml).map_err(cascade_err)
    }

    pub fn from_xml(xml: &str) -> Result<Self, String> {
        let doc = roxmltree::Document::parse(xml).map_err(|e| e.to_string())?;
        let root = doc
            .descendants()
            .find(|n| n.has_tag_name("cascade"))
            .ok_or("no <cascade> element")?;

        let feature_type = child_text(root, "featureType").unwrap_or("HAAR");
        if !feature_type.eq_ignore_ascii_case("HAAR") {
            return Err(format!("unsupported feature type {feature_type}"));
        }
        let window_width: u32 = parse_child(root, "width")?;
        let window_height: u32 = parse_child(root, "height")?;
        if window_width < 3 || window_height < 3 {
            return Err(format!(
                "window {window_width}x{window_height} is too small"
            ));
        }

        let features = items(root, "features")?
            .map(|node| parse_feature(node, window_width, window_height))
            .collect::<Result<Vec<_>, _>>()?;
        let stages = items(root, "stages")?
            .map(|node| parse_stage(node, features.len()))
            .collect::<Result<Vec<_>, _>>()?;
        if stages.is_empty() {
            return Err("cascade has no stages".into());
        }

        Ok(Self {
            window_width,
            window_height,
            stages,
            features,
        })
    }

    pub fn window_size(&self) -> (u32, u32) {
        (self.window_width, self.window_height)
    }

    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    pub fn feature_count(&self) -> usize {
        self.features.len()
    }

    /// Runs every stage on the window whose top-left corner is `(ox, oy)`.
    fn accepts(&self, ii: &IntegralImage, ox: usize, oy: usize) -> bool {
        let w = self.window_width as usize;
        let h = self.window_height as usize;

        // Variance normalisation over the window minus a 1 px border.
        let area = ((w - 2) * (h - 2)) as f64;
        let sum = ii.rect_sum(ox + 1, oy + 1, w - 2, h - 2) as f64;
        let sq_sum = ii.rect_sq_sum(ox + 1, oy + 1, w - 2, h - 2) as f64;
        let nf = area * sq_sum - sum * sum;
        let inv_norm = if nf > 0.0 { 1.0 / nf.sqrt() } else { 1.0 };

        self.stages.iter().all(|stage| {
            let total: f64 = stage
                .trees
                .iter()
                .map(|tree| tree.predict(|f| self.features[f].value(ii, ox, oy) * inv_norm))
                .sum();
            total >= stage.threshold
        })
    }

    /// Raw hits over all pyramid levels, in original-image coordinates.
    fn scan(&self, gray: &GrayImage, params: &DetectorParams) -> Vec<Rect> {
        let (img_w, img_h) = gray.dimensions();
        let mut hits = Vec::new();
        let mut factor = 1.0f64;

        loop {
            let window_w = (f64::from(self.window_width) * factor).round() as u32;
            let window_h = (f64::from(self.window_height) * factor).round() as u32;
            let scaled_w = (f64::from(img_w) / factor).round() as u32;
            let scaled_h = (f64::from(img_h) / factor).round() as u32;
            if window_w > img_w
                || window_h > img_h
                || scaled_w < self.window_width
                || scaled_h < self.window_height
            {
                break;
            }

            if window_w >= params.min_face_size && window_h >= params.min_face_size {
                let scaled: Cow<'_, GrayImage> = if (scaled_w, scaled_h) == (img_w, img_h) {
                    Cow::Borrowed(gray)
                } else {
                    Cow::Owned(image::imageops::resize(
                        gray,
                        scaled_w,
                        scaled_h,
                        FilterType::Triangle,
                    ))
                };
                let ii = IntegralImage::new(&scaled);
                let step = if factor > 2.0 { 1 } else { 2 };
                let max_x = (scaled_w - self.window_width) as usize;
                let max_y = (scaled_h - self.window_height) as usize;

                for y in (0..=max_y).step_by(step) {
                    for x in (0..=max_x).step_by(step) {
                        if self.accepts(&ii, x, y) {
                            hits.push(Rect::new(
                                (x as f64 * factor).round() as i32,
                                (y as f64 * factor).round() as i32,
                                window_w as i32,
                                window_h as i32,
                            ));
                        }
                    }
                }
            }

            factor *= params.scale_factor;
        }
        hits
    }
}

/// [`FaceEngine`] backed by a [`HaarCascade`].
pub struct HaarCascadeEngine {
    cascade: HaarCascade,
}

impl HaarCascadeEngine {
    pub fn new(cascade: HaarCascade) -> Self {
        Self { cascade }
    }

    pub fn load(path: &Path) -> Result<Self, ModelLoadError> {
        Ok(Self::new(HaarCascade::load(path)?))
    }
}

impl FaceEngine for HaarCascadeEngine {
    fn detect(
        &self,
        gray: &GrayImage,
        params: &DetectorParams,
    ) -> Result<Vec<Rect>, Box<dyn std::error::Error>> {
        params.validate()?;
        let hits = self.cascade.scan(gray, params);
        let faces = group_rectangles(&hits, params.min_neighbors, GROUP_EPS);
        log::debug!("Cascade: {} raw hits -> {} faces", hits.len(), faces.len());
        Ok(faces)
    }
}

// ---------------------------------------------------------------------------
// XML parsing
// ---------------------------------------------------------------------------

fn child<'a, 'input>(
    node: roxmltree::Node<'a, 'input>,
    name: &str,
) -> Option<roxmltree::Node<'a, 'input>> {
    node.children().find(|n| n.has_tag_name(name))
}

fn child_text<'a>(node: roxmltree::Node<'a, '_>, name: &str) -> Option<&'a str> {
    child(node, name).and_then(|n| n.text()).map(str::trim)
}

fn parse_child<T: std::str::FromStr>(node: roxmltree::Node, name: &str) -> Result<T, String> {
    child_text(node, name)
        .ok_or_else(|| format!("missing <{name}>"))?
        .parse()
        .map_err(|_| format!("invalid <{name}>"))
}

/// Element children of the list element `<name>` (OpenCV stores list
/// entries as `<_>` elements).
fn items<'a, 'input>(
    node: roxmltree::Node<'a, 'input>,
    name: &str,
) -> Result<impl Iterator<Item = roxmltree::Node<'a, 'input>>, String> {
    let list = child(node, name).ok_or_else(|| format!("missing <{name}>"))?;
    Ok(list.children().filter(|n| n.is_element()))
}

fn numbers<T: std::str::FromStr>(text: Option<&str>, what: &str) -> Result<Vec<T>, String> {
    text.unwrap_or("")
        .split_whitespace()
        .map(|tok| tok.parse().map_err(|_| format!("invalid {what} value {tok:?}")))
        .collect()
}

fn parse_feature(
    node: roxmltree::Node,
    window_width: u32,
    window_height: u32,
) -> Result<HaarFeature, String> {
    if child_text(node, "tilted").is_some_and(|t| t != "0") {
        return Err("tilted features are not supported".into());
    }

    let rects = items(node, "rects")?
        .map(|r| -> Result<WeightedRect, String> {
            let v: Vec<f64> = numbers(r.text(), "rect")?;
            if v.len() != 5 {
                return Err(format!("rect needs 5 values, got {}", v.len()));
            }
            if v[..4].iter().any(|c| *c < 0.0 || c.fract() != 0.0) {
                return Err("rect coordinates must be non-negative integers".into());
            }
            let rect = WeightedRect {
                x: v[0] as usize,
                y: v[1] as usize,
                width: v[2] as usize,
                height: v[3] as usize,
                weight: v[4],
            };
            if rect.x + rect.width > window_width as usize
                || rect.y + rect.height > window_height as usize
            {
                return Err("feature rect exceeds the detection window".into());
            }
            Ok(rect)
        })
        .collect::<Result<Vec<_>, _>>()?;

    if rects.is_empty() {
        return Err("feature has no rects".into());
    }
    Ok(HaarFeature { rects })
}

fn parse_stage(node: roxmltree::Node, feature_count: usize) -> Result<Stage, String> {
    let threshold: f64 = parse_child(node, "stageThreshold")?;
    let trees = items(node, "weakClassifiers")?
        .map(|weak| parse_tree(weak, feature_count))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Stage { threshold, trees })
}

fn parse_tree(node: roxmltree::Node, feature_count: usize) -> Result<WeakTree, String> {
    let raw: Vec<f64> = numbers(child_text(node, "internalNodes"), "internalNodes")?;
    let leaves: Vec<f64> = numbers(child_text(node, "leafValues"), "leafValues")?;
    if raw.is_empty() || raw.len() % 4 != 0 {
        return Err("internalNodes must hold groups of 4 values".into());
    }

    let nodes: Vec<Node> = raw
        .chunks_exact(4)
        .map(|c| Node {
            left: c[0] as i32,
            right: c[1] as i32,
            feature: c[2] as usize,
            threshold: c[3],
        })
        .collect();

    for (i, n) in nodes.iter().enumerate() {
        if n.feature >= feature_count {
            return Err(format!("feature index {} out of range", n.feature));
        }
        for c in [n.left, n.right] {
            let valid = if c <= 0 {
                ((-c) as usize) < leaves.len()
            } else {
                (c as usize) > i && (c as usize) < nodes.len()
            };
            if !valid {
                return Err(format!("invalid child index {c} in node {i}"));
            }
        }
    }

    Ok(WeakTree { nodes, leaves })
}
