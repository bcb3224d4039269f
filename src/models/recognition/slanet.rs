//! SLANet table structure model (PP-Structure SLANet_plus export).

use crate::core::errors::{VesselError, VesselResult};
use crate::core::inference::{OrtInfer, OutputTensor, Tensor4D};
use crate::processors::resize::resize_long_side;
use crate::processors::{DecodedTable, NormalizeImage, TableStructureDecode};
use image::RgbImage;
use ndarray::{Axis, Ix3};

/// Side of the square model input.
pub const TABLE_INPUT_SIZE: u32 = 488;

#[derive(Debug)]
pub struct SlanetModel {
    inference: OrtInfer,
    normalizer: NormalizeImage,
    decoder: TableStructureDecode,
}

impl SlanetModel {
    pub fn new(inference: OrtInfer, decoder: TableStructureDecode) -> VesselResult<Self> {
        Ok(Self {
            inference,
            normalizer: NormalizeImage::imagenet_bgr()?,
            decoder,
        })
    }

    /// Scales the long side to the input size and zero-pads to a square.
    pub fn preprocess(&self, image: &RgbImage) -> VesselResult<Tensor4D> {
        let (resized, _) = resize_long_side(image, TABLE_INPUT_SIZE);
        self.normalizer
            .normalize_padded(&resized, TABLE_INPUT_SIZE, TABLE_INPUT_SIZE)
    }

    /// Predicts structure tokens and cell boxes for one table crop.
    pub fn forward(&self, image: &RgbImage) -> VesselResult<DecodedTable> {
        let (w, h) = image.dimensions();
        if w == 0 || h == 0 {
            return Ok(DecodedTable::default());
        }

        let tensor = self.preprocess(image)?;
        let outputs = self.inference.run(&tensor)?;
        let (structure, boxes) = self.split_outputs(&outputs)?;

        let structure = structure
            .view()?
            .into_dimensionality::<Ix3>()?
            .index_axis_move(Axis(0), 0);
        let boxes = boxes
            .view()?
            .into_dimensionality::<Ix3>()?
            .index_axis_move(Axis(0), 0);

        Ok(self
            .decoder
            .decode(structure, boxes, w.max(h) as f32, w, h))
    }

    /// Picks the structure head by its vocabulary-sized last dimension.
    fn split_outputs<'a>(
        &self,
        outputs: &'a [OutputTensor],
    ) -> VesselResult<(&'a OutputTensor, &'a OutputTensor)> {
        let vocab = self.decoder.vocab_size();
        let structure = outputs
            .iter()
            .position(|o| o.shape.len() == 3 && o.shape[2] == vocab);
        let boxes = outputs
            .iter()
            .position(|o| o.shape.len() == 3 && (o.shape[2] == 4 || o.shape[2] == 8));

        match (structure, boxes) {
            (Some(s), Some(b)) if s != b => Ok((&outputs[s], &outputs[b])),
            _ => Err(VesselError::malformed_output(
                self.inference.model_name(),
                format!(
                    "expected structure [1, seq, {vocab}] and box [1, seq, 4|8] outputs, got {:?}",
                    outputs.iter().map(|o| &o.shape).collect::<Vec<_>>()
                ),
            )),
        }
    }
}
