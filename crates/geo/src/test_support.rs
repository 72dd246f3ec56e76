//! Shapefile and dBase fixtures for tests.

/// Encode a polygon `.shp` with one record per entry; each record is a list
/// of rings (outer rings clockwise, holes counter-clockwise).
pub fn multipart_shp_bytes(records: &[Vec<Vec<(f64, f64)>>]) -> Vec<u8> {
    let mut body = Vec::new();
    let (mut xmin, mut ymin, mut xmax, mut ymax) = (f64::MAX, f64::MAX, f64::MIN, f64::MIN);

    for (i, rings) in records.iter().enumerate() {
        let points: Vec<(f64, f64)> = rings.iter().flatten().copied().collect();
        let (mut rxmin, mut rymin, mut rxmax, mut rymax) = (f64::MAX, f64::MAX, f64::MIN, f64::MIN);
        for &(x, y) in &points {
            rxmin = rxmin.min(x);
            rymin = rymin.min(y);
            rxmax = rxmax.max(x);
            rymax = rymax.max(y);
        }
        xmin = xmin.min(rxmin);
        ymin = ymin.min(rymin);
        xmax = xmax.max(rxmax);
        ymax = ymax.max(rymax);

        let mut content = Vec::new();
        content.extend_from_slice(&5i32.to_le_bytes());
        for v in [rxmin, rymin, rxmax, rymax] {
            content.extend_from_slice(&v.to_le_bytes());
        }
        content.extend_from_slice(&(rings.len() as i32).to_le_bytes());
        content.extend_from_slice(&(points.len() as i32).to_le_bytes());
        let mut start = 0i32;
        for ring in rings {
            content.extend_from_slice(&start.to_le_bytes());
            start += ring.len() as i32;
        }
        for (x, y) in points {
            content.extend_from_slice(&x.to_le_bytes());
            content.extend_from_slice(&y.to_le_bytes());
        }

        body.extend_from_slice(&(i as i32 + 1).to_be_bytes());
        body.extend_from_slice(&((content.len() / 2) as i32).to_be_bytes());
        body.extend_from_slice(&content);
    }

    let mut header = vec![0u8; 100];
    header[0..4].copy_from_slice(&9994i32.to_be_bytes());
    header[24..28].copy_from_slice(&(((100 + body.len()) / 2) as i32).to_be_bytes());
    header[28..32].copy_from_slice(&1000i32.to_le_bytes());
    header[32..36].copy_from_slice(&5i32.to_le_bytes());
    for (k, v) in [xmin, ymin, xmax, ymax].into_iter().enumerate() {
        header[36 + k * 8..44 + k * 8].copy_from_slice(&v.to_le_bytes());
    }

    header.extend_from_slice(&body);
    header
}

/// Encode single-ring polygons, one record each
pub fn polygon_shp_bytes(polygons: &[Vec<(f64, f64)>]) -> Vec<u8> {
    let records: Vec<Vec<Vec<(f64, f64)>>> = polygons.iter().map(|p| vec![p.clone()]).collect();
    multipart_shp_bytes(&records)
}

/// Closed clockwise square with its lower-left corner at `(x, y)`
pub fn clockwise_square(x: f64, y: f64, side: f64) -> Vec<(f64, f64)> {
    vec![
        (x, y),
        (x, y + side),
        (x + side, y + side),
        (x + side, y),
        (x, y),
    ]
}

/// Encode a dBase III table with a single character field, one record per
/// value
pub fn dbf_bytes(field: &str, values: &[&str]) -> Vec<u8> {
    const WIDTH: usize = 20;

    let mut out = vec![0u8; 32];
    out[0] = 0x03;
    out[1..4].copy_from_slice(&[124, 1, 1]);
    out[4..8].copy_from_slice(&(values.len() as u32).to_le_bytes());
    out[8..10].copy_from_slice(&((32 + 32 + 1) as u16).to_le_bytes());
    out[10..12].copy_from_slice(&((1 + WIDTH) as u16).to_le_bytes());

    let mut descriptor = [0u8; 32];
    let name = field.as_bytes();
    descriptor[..name.len().min(10)].copy_from_slice(&name[..name.len().min(10)]);
    descriptor[11] = b'C';
    descriptor[16] = WIDTH as u8;
    out.extend_from_slice(&descriptor);
    out.push(0x0D);

    for value in values {
        out.push(b' ');
        let mut data = [b' '; WIDTH];
        let bytes = value.as_bytes();
        data[..bytes.len().min(WIDTH)].copy_from_slice(&bytes[..bytes.len().min(WIDTH)]);
        out.extend_from_slice(&data);
    }
    out.push(0x1A);
    out
}
