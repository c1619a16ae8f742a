//! Conversions between the coordinate notations used in PAGE-XML and by
//! image processors: `points` strings (`"x,y x,y ..."`), polygons, bounding
//! boxes (`x0,y0,x1,y1`) and `x/y/w/h` rectangles.

use thiserror::Error;

pub type Point = [i64; 2];
pub type Polygon = Vec<Point>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoordinateError {
    #[error("Invalid point '{0}' (expected 'x,y')")]
    InvalidPoint(String),
    #[error("Empty points string")]
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Xywh {
    pub x: i64,
    pub y: i64,
    pub w: i64,
    pub h: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub x0: i64,
    pub y0: i64,
    pub x1: i64,
    pub y1: i64,
}

impl BoundingBox {
    pub fn new(x0: i64, y0: i64, x1: i64, y1: i64) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn as_tuple(&self) -> (i64, i64, i64, i64) {
        (self.x0, self.y0, self.x1, self.y1)
    }
}

/// Parse a points string into a polygon.
pub fn polygon_from_points(points: &str) -> Result<Polygon, CoordinateError> {
    let polygon = points
        .split_whitespace()
        .map(|pair| {
            let (x, y) = pair
                .split_once(',')
                .ok_or_else(|| CoordinateError::InvalidPoint(pair.to_string()))?;
            let parse = |v: &str| {
                v.trim()
                    .parse::<f64>()
                    .map(|f| f.round() as i64)
                    .map_err(|_| CoordinateError::InvalidPoint(pair.to_string()))
            };
            Ok([parse(x)?, parse(y)?])
        })
        .collect::<Result<Polygon, _>>()?;
    if polygon.is_empty() {
        return Err(CoordinateError::Empty);
    }
    Ok(polygon)
}

pub fn points_from_polygon(polygon: &[Point]) -> String {
    polygon
        .iter()
        .map(|[x, y]| format!("{x},{y}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Corner polygon (clockwise from top-left) of a box.
pub fn polygon_from_x0y0x1y1(bbox: [i64; 4]) -> Polygon {
    let [x0, y0, x1, y1] = bbox;
    vec![[x0, y0], [x1, y0], [x1, y1], [x0, y1]]
}

pub fn points_from_x0y0x1y1(bbox: [i64; 4]) -> String {
    points_from_polygon(&polygon_from_x0y0x1y1(bbox))
}

pub fn points_from_bbox(x0: i64, y0: i64, x1: i64, y1: i64) -> String {
    points_from_x0y0x1y1([x0, y0, x1, y1])
}

pub fn bbox_from_xywh(xywh: Xywh) -> BoundingBox {
    BoundingBox::new(xywh.x, xywh.y, xywh.x + xywh.w, xywh.y + xywh.h)
}

pub fn points_from_xywh(xywh: Xywh) -> String {
    let b = bbox_from_xywh(xywh);
    points_from_bbox(b.x0, b.y0, b.x1, b.y1)
}

/// Axis-aligned bounding box of all points, independent of their order.
pub fn bbox_from_polygon(polygon: &[Point]) -> Result<BoundingBox, CoordinateError> {
    let first = polygon.first().ok_or(CoordinateError::Empty)?;
    let mut bbox = BoundingBox::new(first[0], first[1], first[0], first[1]);
    for [x, y] in polygon.iter().skip(1) {
        bbox.x0 = bbox.x0.min(*x);
        bbox.y0 = bbox.y0.min(*y);
        bbox.x1 = bbox.x1.max(*x);
        bbox.y1 = bbox.y1.max(*y);
    }
    Ok(bbox)
}

pub fn bbox_from_points(points: &str) -> Result<BoundingBox, CoordinateError> {
    bbox_from_polygon(&polygon_from_points(points)?)
}

pub fn xywh_from_bbox(bbox: BoundingBox) -> Xywh {
    Xywh {
        x: bbox.x0,
        y: bbox.y0,
        w: bbox.x1 - bbox.x0,
        h: bbox.y1 - bbox.y0,
    }
}

pub fn xywh_from_polygon(polygon: &[Point]) -> Result<Xywh, CoordinateError> {
    bbox_from_polygon(polygon).map(xywh_from_bbox)
}

pub fn xywh_from_points(points: &str) -> Result<Xywh, CoordinateError> {
    bbox_from_points(points).map(xywh_from_bbox)
}
