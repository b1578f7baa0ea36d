use metallograph::image::ImageU8;
use metallograph::prelude::*;

fn main() {
    // Demo stub: a synthetic field with one dark pore on a bright matrix.
    let (w, h) = (320usize, 240usize);
    let stride = w; // tightly packed
    let mut gray = vec![210u8; w * h];
    let (cx, cy, r) = (160isize, 120isize, 18isize);
    for y in 0..h as isize {
        for x in 0..w as isize {
            if (x - cx).pow(2) + (y - cy).pow(2) <= r * r {
                gray[(y * w as isize + x) as usize] = 25;
            }
        }
    }
    let image = SourceImage::from_gray_view(
        "demo-field",
        ImageU8 {
            w,
            h,
            stride,
            data: &gray,
        },
    );

    let request = AnalysisRequest::new(AnalysisKind::Porosity, SegmentationParams::otsu());
    match AnalysisEngine::new().analyze(&image, &request) {
        Ok(result) => println!(
            "features={} mean_area={:?} calibrated={}",
            result.features.len(),
            result.statistics.mean,
            result.calibrated
        ),
        Err(err) => {
            eprintln!("Error: {err}");
            std::process::exit(1);
        }
    }
}
