//! Crate-level integration tests.
//!
//! These drive the full pipeline and the HTTP handlers over a
//! deterministic stub embedder and a synthetic catalog/index, so no model
//! download is involved.


pub(crate) mod support {
    use std::hash::{Hash, Hasher};
    use std::sync::Arc;

    use image::DynamicImage;

    use crate::catalog::{CatalogStore, Product};
    use crate::embedding::{Embedder, EmbeddingError};
    use crate::search::{ProductIndex, SearchService};

    /// Deterministic stand-in for the embedding service: every input maps
    /// to a repeatable pseudo-random unit vector.
    pub struct HashEmbedder {
        pub dims: usize,
    }

    impl HashEmbedder {
        fn seeded(&self, seed: u64) -> Vec<f32> {
            let mut state = seed | 1;
            let mut vec = Vec::with_capacity(self.dims);
            for _ in 0..self.dims {
                state = state
                    .wrapping_mul(6364136223846793005)
                    .wrapping_add(1442695040888963407);
                let value = ((state >> 33) as f32 / (1u64 << 31) as f32) - 0.5;
                vec.push(value);
            }
            let norm: f32 = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
            for x in &mut vec {
                *x /= norm;
            }
            vec
        }
    }

    impl Embedder for HashEmbedder {
        fn dimensions(&self) -> usize {
            self.dims
        }

        fn embed_text(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            let mut hasher = std::collections::hash_map::DefaultHasher::new();
            text.hash(&mut hasher);
            Ok(self.seeded(hasher.finish()))
        }

        fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            texts.iter().map(|t| self.embed_text(t)).collect()
        }

        fn embed_image(&self, image: &DynamicImage) -> Result<Vec<f32>, EmbeddingError> {
            let rgb = image.to_rgb8();
            let mut hasher = std::collections::hash_map::DefaultHasher::new();
            (rgb.width(), rgb.height()).hash(&mut hasher);
            rgb.get_pixel(0, 0).0.hash(&mut hasher);
            rgb.get_pixel(rgb.width() / 2, rgb.height() / 2).0.hash(&mut hasher);
            Ok(self.seeded(hasher.finish()))
        }

        fn embed_images(&self, images: &[DynamicImage]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            images.iter().map(|i| self.embed_image(i)).collect()
        }
    }

    pub fn product(
        id: u64,
        name: &str,
        master: &str,
        sub: &str,
        article: &str,
        colour: &str,
        rating: Option<f32>,
    ) -> Product {
        Product {
            id,
            display_name: name.to_string(),
            master_category: master.to_string(),
            sub_category: sub.to_string(),
            article_type: article.to_string(),
            base_colour: colour.to_string(),
            rating,
            num_reviews: rating.map(|_| 10),
            price: Some(40.0),
            discount_percent: None,
            image_url: Some(format!("http://img/{id}.jpg")),
            image_filename: None,
        }
    }

    pub fn fixture_products() -> Vec<Product> {
        vec![
            product(1, "Red Bomber Jacket", "Apparel", "Jackets", "Jackets", "Red", Some(4.5)),
            product(2, "Blue Bomber Jacket", "Apparel", "Jackets", "Jackets", "Blue", Some(3.5)),
            product(3, "Red Denim Jacket", "Apparel", "Jackets", "Jackets", "Red", None),
            product(4, "Blue Denim Jacket", "Apparel", "Jackets", "Jackets", "Blue", None),
            product(5, "Summer Floral Dress", "Apparel", "Dress", "Dresses", "Yellow", Some(4.0)),
            product(6, "White Running Shoes", "Footwear", "Shoes", "Sports Shoes", "White", Some(4.8)),
        ]
    }

    /// Service over the fixture catalog; index rows are the stub text
    /// embeddings of each display name, in id order.
    pub fn build_service(products: Vec<Product>) -> SearchService {
        let embedder = Arc::new(HashEmbedder { dims: 8 });

        let mut index = ProductIndex::new(8);
        for p in &products {
            let row = embedder.embed_text(&p.display_name).unwrap();
            index.push(p.id, row).unwrap();
        }

        let catalog = CatalogStore::from_products(products);
        SearchService::with_components(embedder, index, catalog).unwrap()
    }

    pub fn fixture_service() -> SearchService {
        build_service(fixture_products())
    }

    /// In-memory PNG for image-query tests.
    pub fn test_png(w: u32, h: u32, rgba: [u8; 4]) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(w, h, image::Rgba(rgba));
        let mut buf = Vec::new();
        let mut cursor = std::io::Cursor::new(&mut buf);
        img.write_to(&mut cursor, image::ImageFormat::Png).unwrap();
        buf
    }
}
