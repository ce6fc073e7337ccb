#![allow(dead_code)]

use std::{cell::RefCell, collections::VecDeque, future::Future, io::Cursor, rc::Rc};

use image::{ImageFormat, Rgb, RgbImage};

use visual_search::{
    DetectionApi, DetectionRequest,
    error::Result,
    geometry::NormalizedBox,
    response::{Detection, DetectionResponse, Product},
};

/// Encode a PNG. With `noise` the pixels are pseudo-random so the file does
/// not compress.
pub fn make_png(width: u32, height: u32, noise: bool) -> Vec<u8> {
    let mut state: u32 = 0x1234_5678;
    let img = RgbImage::from_fn(width, height, |x, y| {
        if noise {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            let b = state.to_le_bytes();
            Rgb([b[1], b[2], b[3]])
        } else {
            Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        }
    });
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).unwrap();
    buf.into_inner()
}

pub fn products(n: usize) -> Vec<Product> {
    (0..n)
        .map(|i| Product {
            id: i.to_string(),
            title: format!("Product {i}"),
            handle: format!("product-{i}"),
            price: 10.0 + i as f64,
            currency: Some("USD".to_string()),
            available: true,
            ..Default::default()
        })
        .collect()
}

pub fn detection(id: &str, coords: [f32; 4], label: Option<&str>) -> Detection {
    Detection {
        box_id: id.to_string(),
        bbox: NormalizedBox::from_coords(coords).unwrap(),
        label: label.map(str::to_string),
    }
}

#[derive(Default)]
pub struct FakeState {
    pub responses: VecDeque<Result<DetectionResponse>>,
    pub calls: Vec<DetectionRequest>,
}

/// Detection backend answering from a queue and recording every request.
#[derive(Clone, Default)]
pub struct FakeApi {
    pub state: Rc<RefCell<FakeState>>,
}

impl FakeApi {
    pub fn with_responses(responses: Vec<Result<DetectionResponse>>) -> Self {
        let api = Self::default();
        api.state.borrow_mut().responses = responses.into();
        api
    }

    pub fn push(&self, response: Result<DetectionResponse>) {
        self.state.borrow_mut().responses.push_back(response);
    }

    pub fn call_count(&self) -> usize {
        self.state.borrow().calls.len()
    }

    pub fn last_call(&self) -> Option<DetectionRequest> {
        self.state.borrow().calls.last().cloned()
    }
}

impl DetectionApi for FakeApi {
    fn detect(&self, request: DetectionRequest) -> impl Future<Output = Result<DetectionResponse>> {
        let mut state = self.state.borrow_mut();
        state.calls.push(request);
        let response = state
            .responses
            .pop_front()
            .unwrap_or_else(|| Ok(DetectionResponse::default()));
        async move { response }
    }
}
