//! Pagination – tiles one rendered surface over fixed-size pages.
//!
//! The surface is scaled uniformly so its width fills the page width. When
//! the scaled height exceeds one page, the whole image is drawn on every
//! page and shifted up by one page height per page, so page `k` shows the
//! band starting `k * page_height` points below the top.

use crate::raster::RenderSurface;

/// Remaining heights at or below this many points do not start a new page,
/// so exact multiples of the page height never produce a trailing blank page.
pub const PAGE_EPSILON_PT: f64 = 1e-3;

/// How one surface is spread over pages.
///
/// Cheap to copy; [`Pagination::iter`] restarts the placement sequence from
/// the first page every time it is called.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pagination {
    pub page_width_pt: f32,
    pub page_height_pt: f32,
    /// Surface height after scaling its width to `page_width_pt`.
    pub scaled_height_pt: f32,
}

/// Where the surface is drawn on one page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PagePlacement {
    /// Zero-based page index within this surface's pages.
    pub index: usize,
    /// Vertical draw offset of the surface's top edge from the page top, in
    /// points. Zero on the first page, negative afterwards.
    pub offset_pt: f32,
}

/// Compute the pagination of `surface` onto pages of the given size.
pub fn paginate(surface: &RenderSurface, page_width_pt: f32, page_height_pt: f32) -> Pagination {
    Pagination::new(surface.width(), surface.height(), page_width_pt, page_height_pt)
}

impl Pagination {
    pub fn new(surface_width: u32, surface_height: u32, page_width_pt: f32, page_height_pt: f32) -> Self {
        let scaled_height_pt = if surface_width == 0 || surface_height == 0 || page_width_pt <= 0.0 {
            0.0
        } else {
            (surface_height as f64 * page_width_pt as f64 / surface_width as f64) as f32
        };
        Self {
            page_width_pt,
            page_height_pt,
            scaled_height_pt,
        }
    }

    /// Lazily yield page placements, first page first.
    pub fn iter(&self) -> Placements {
        Placements {
            pagination: *self,
            next_index: 0,
            remaining: self.scaled_height_pt as f64,
            done: false,
        }
    }

    pub fn page_count(&self) -> usize {
        self.iter().count()
    }

    /// Whether the surface needs more than one page.
    pub fn is_multi_page(&self) -> bool {
        self.scaled_height_pt > self.page_height_pt
    }
}

impl<'a> IntoIterator for &'a Pagination {
    type Item = PagePlacement;
    type IntoIter = Placements;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the placements of one [`Pagination`].
#[derive(Debug, Clone)]
pub struct Placements {
    pagination: Pagination,
    next_index: usize,
    /// Scaled height not yet shown on any page.
    remaining: f64,
    done: bool,
}

impl Iterator for Placements {
    type Item = PagePlacement;

    fn next(&mut self) -> Option<PagePlacement> {
        if self.done {
            return None;
        }
        let page_h = self.pagination.page_height_pt as f64;
        let scaled = self.pagination.scaled_height_pt as f64;

        if self.next_index == 0 {
            // A degenerate page height can never tile; show one page.
            if !self.pagination.is_multi_page() || page_h <= 0.0 {
                self.done = true;
            } else {
                self.remaining -= page_h;
            }
            self.next_index = 1;
            return Some(PagePlacement {
                index: 0,
                offset_pt: 0.0,
            });
        }

        if self.remaining <= PAGE_EPSILON_PT {
            self.done = true;
            return None;
        }
        let offset = self.remaining - scaled;
        self.remaining -= page_h;
        let index = self.next_index;
        self.next_index += 1;
        Some(PagePlacement {
            index,
            offset_pt: offset as f32,
        })
    }
}
