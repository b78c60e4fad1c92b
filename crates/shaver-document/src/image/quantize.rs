// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Median-cut palette used to reduce rendered pages to indexed colour.

use std::cell::RefCell;
use std::collections::HashMap;

use image::imageops::ColorMap;
use image::{Rgb, RgbImage};

/// A palette of at most 256 colours, usable with `image::imageops::dither`.
#[derive(Debug)]
pub struct Palette {
    colors: Vec<[u8; 3]>,
    nearest: RefCell<HashMap<[u8; 3], usize>>,
}

impl Palette {
    /// Build a palette of up to `max_colors` entries for `image`.
    ///
    /// Images that already use no more than `max_colors` distinct colours
    /// keep them exactly.
    pub fn median_cut(image: &RgbImage, max_colors: usize) -> Self {
        let max_colors = max_colors.clamp(1, 256);

        let mut histogram: HashMap<[u8; 3], u32> = HashMap::new();
        for pixel in image.pixels() {
            *histogram.entry(pixel.0).or_insert(0) += 1;
        }
        let mut entries: Vec<([u8; 3], u32)> = histogram.into_iter().collect();
        entries.sort_unstable();

        let colors = if entries.len() <= max_colors {
            entries.into_iter().map(|(color, _)| color).collect()
        } else {
            let mut boxes = vec![entries];
            while boxes.len() < max_colors {
                let Some((slot, channel)) = widest_box(&boxes) else {
                    break;
                };
                let mut colors = boxes.swap_remove(slot);
                let (low, high) = split_at_median(&mut colors, channel);
                boxes.push(low);
                boxes.push(high);
            }
            boxes.iter().map(|b| average(b)).collect()
        };

        Self {
            colors,
            nearest: RefCell::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn colors(&self) -> &[[u8; 3]] {
        &self.colors
    }

    fn nearest_index(&self, color: [u8; 3]) -> usize {
        if let Some(index) = self.nearest.borrow().get(&color) {
            return *index;
        }
        let index = self
            .colors
            .iter()
            .enumerate()
            .min_by_key(|(_, candidate)| distance(**candidate, color))
            .map(|(index, _)| index)
            .unwrap_or(0);
        self.nearest.borrow_mut().insert(color, index);
        index
    }
}

impl ColorMap for Palette {
    type Color = Rgb<u8>;

    fn index_of(&self, color: &Rgb<u8>) -> usize {
        self.nearest_index(color.0)
    }

    fn lookup(&self, index: usize) -> Option<Rgb<u8>> {
        self.colors.get(index).map(|c| Rgb(*c))
    }

    fn has_lookup(&self) -> bool {
        true
    }

    fn map_color(&self, color: &mut Rgb<u8>) {
        if let Some(mapped) = self.colors.get(self.nearest_index(color.0)) {
            color.0 = *mapped;
        }
    }
}

fn distance(a: [u8; 3], b: [u8; 3]) -> u32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = i32::from(*x) - i32::from(*y);
            (d * d) as u32
        })
        .sum()
}

/// The splittable box with the widest channel range, and that channel.
fn widest_box(boxes: &[Vec<([u8; 3], u32)>]) -> Option<(usize, usize)> {
    boxes
        .iter()
        .enumerate()
        .filter(|(_, colors)| colors.len() > 1)
        .map(|(slot, colors)| {
            let (channel, range) = (0..3)
                .map(|channel| {
                    let min = colors.iter().map(|(c, _)| c[channel]).min().unwrap_or(0);
                    let max = colors.iter().map(|(c, _)| c[channel]).max().unwrap_or(0);
                    (channel, max - min)
                })
                .max_by_key(|(_, range)| *range)
                .unwrap_or((0, 0));
            (slot, channel, range)
        })
        .max_by_key(|(_, _, range)| *range)
        .map(|(slot, channel, _)| (slot, channel))
}

/// Split a box of two or more colours so each half carries roughly half the
/// pixels. Both halves are non-empty.
fn split_at_median(
    colors: &mut [([u8; 3], u32)],
    channel: usize,
) -> (Vec<([u8; 3], u32)>, Vec<([u8; 3], u32)>) {
    colors.sort_unstable_by_key(|(c, _)| c[channel]);
    let total: u64 = colors.iter().map(|(_, n)| u64::from(*n)).sum();
    let mut seen = 0u64;
    let mut cut = 1;
    for (i, (_, n)) in colors.iter().enumerate() {
        seen += u64::from(*n);
        if seen * 2 >= total {
            cut = i + 1;
            break;
        }
    }
    let cut = cut.clamp(1, colors.len() - 1);
    (colors[..cut].to_vec(), colors[cut..].to_vec())
}

fn average(colors: &[([u8; 3], u32)]) -> [u8; 3] {
    let total: u64 = colors.iter().map(|(_, n)| u64::from(*n)).sum::<u64>().max(1);
    let mut sums = [0u64; 3];
    for (color, n) in colors {
        for (sum, channel) in sums.iter_mut().zip(color.iter()) {
            *sum += u64::from(*channel) * u64::from(*n);
        }
    }
    sums.map(|sum| (sum / total) as u8)
}
