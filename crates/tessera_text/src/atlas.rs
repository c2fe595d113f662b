//! Glyph atlas
//!
//! Packs rasterized glyph bitmaps into fixed-size square texture pages using
//! a shelf allocator. A single cursor `(line_x, line_y, line_height)` walks
//! the newest page: a glyph that does not fit the remaining shelf width opens
//! a new shelf below, and a glyph that does not fit the remaining page height
//! opens a new, cleared page. Earlier pages are never revisited.
//!
//! Texture storage is behind [`TextureBackend`] so the atlas can drive a GPU
//! API or, with [`CpuTextures`], plain memory.

use crate::rasterizer::GlyphBitmap;
use rustc_hash::FxHashMap;

/// Opaque handle to one atlas page owned by a [`TextureBackend`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u32);

/// Texture storage used by the atlas
///
/// Pages are single-channel (8-bit coverage) squares. `upload` always
/// receives tightly packed rows (`width` bytes per row).
pub trait TextureBackend {
    /// Allocate a new `size` x `size` page
    fn create_page(&mut self, size: u32) -> TextureHandle;
    /// Fill a page with transparent (zero) coverage
    fn clear_page(&mut self, page: TextureHandle);
    /// Copy a tightly packed bitmap into a sub-rectangle of a page
    fn upload(
        &mut self,
        page: TextureHandle,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        pixels: &[u8],
    );
    /// Release a page
    fn delete_page(&mut self, page: TextureHandle);
}

/// Placement of one glyph inside the atlas
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AtlasAllocation {
    /// Index into the atlas page list
    pub page: u16,
    pub x: u32,
    pub y: u32,
}

/// Shelf-packed atlas over a growing list of pages
#[derive(Debug)]
pub struct GlyphAtlas {
    page_size: u32,
    padding: u32,
    pages: Vec<TextureHandle>,
    line_x: u32,
    line_y: u32,
    line_height: u32,
}

impl GlyphAtlas {
    /// Create an empty atlas. No page exists until the first allocation.
    pub fn new(page_size: u32, padding: u32) -> Self {
        Self {
            page_size,
            padding,
            pages: Vec::new(),
            // Start "full" so the first allocation creates a page
            line_x: page_size,
            line_y: page_size,
            line_height: 0,
        }
    }

    /// Page edge length in pixels
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Texture handles of all pages, in allocation order
    pub fn pages(&self) -> &[TextureHandle] {
        &self.pages
    }

    /// Reserve a `width` x `height` rectangle.
    ///
    /// Returns `None` when the rectangle is larger than a page; such glyphs
    /// can never be placed and the caller renders nothing for them.
    pub fn allocate(
        &mut self,
        backend: &mut dyn TextureBackend,
        width: u32,
        height: u32,
    ) -> Option<AtlasAllocation> {
        if width > self.page_size || height > self.page_size {
            return None;
        }

        if self.line_x + width > self.page_size {
            self.line_x = 0;
            self.line_y += self.line_height;
            self.line_height = 0;
        }

        if self.pages.is_empty() || self.line_y + height > self.page_size {
            let page = backend.create_page(self.page_size);
            backend.clear_page(page);
            self.pages.push(page);
            self.line_x = 0;
            self.line_y = 0;
            self.line_height = 0;
            tracing::debug!(
                "Created atlas page {} ({}x{})",
                self.pages.len() - 1,
                self.page_size,
                self.page_size
            );
        }

        let allocation = AtlasAllocation {
            page: (self.pages.len() - 1) as u16,
            x: self.line_x,
            y: self.line_y,
        };

        self.line_x += width + self.padding;
        self.line_height = self.line_height.max(height + self.padding);

        Some(allocation)
    }

    /// Allocate space for a bitmap and upload its pixels.
    pub fn insert(
        &mut self,
        backend: &mut dyn TextureBackend,
        bitmap: &GlyphBitmap,
    ) -> Option<AtlasAllocation> {
        let allocation = self.allocate(backend, bitmap.width, bitmap.height)?;
        let page = self.pages[allocation.page as usize];

        if bitmap.pitch == bitmap.width as usize {
            backend.upload(
                page,
                allocation.x,
                allocation.y,
                bitmap.width,
                bitmap.height,
                &bitmap.data,
            );
        } else {
            let packed = bitmap.packed_rows();
            backend.upload(
                page,
                allocation.x,
                allocation.y,
                bitmap.width,
                bitmap.height,
                &packed,
            );
        }

        Some(allocation)
    }

    /// Delete every page and rewind the cursor.
    pub fn reset(&mut self, backend: &mut dyn TextureBackend) {
        for page in self.pages.drain(..) {
            backend.delete_page(page);
        }
        self.line_x = self.page_size;
        self.line_y = self.page_size;
        self.line_height = 0;
    }
}

struct CpuPage {
    size: u32,
    pixels: Vec<u8>,
}

/// In-memory texture backend
///
/// Keeps every page as an R8 buffer. Useful when the renderer uploads pages
/// itself, and for tests.
#[derive(Default)]
pub struct CpuTextures {
    pages: FxHashMap<u32, CpuPage>,
    next_handle: u32,
}

impl CpuTextures {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pixel data of a live page
    pub fn pixels(&self, page: TextureHandle) -> Option<&[u8]> {
        self.pages.get(&page.0).map(|p| p.pixels.as_slice())
    }

    /// Number of live pages
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

impl TextureBackend for CpuTextures {
    fn create_page(&mut self, size: u32) -> TextureHandle {
        self.next_handle += 1;
        self.pages.insert(
            self.next_handle,
            CpuPage {
                size,
                // Deliberately non-zero so a missing clear is visible
                pixels: vec![0xFF; (size * size) as usize],
            },
        );
        TextureHandle(self.next_handle)
    }

    fn clear_page(&mut self, page: TextureHandle) {
        if let Some(p) = self.pages.get_mut(&page.0) {
            p.pixels.fill(0);
        }
    }

    fn upload(
        &mut self,
        page: TextureHandle,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) {
        let Some(p) = self.pages.get_mut(&page.0) else {
            tracing::warn!("Upload to unknown texture page {:?}", page);
            return;
        };
        let size = p.size as usize;
        let (x, y, width, height) = (x as usize, y as usize, width as usize, height as usize);
        for row in 0..height {
            let src = &pixels[row * width..(row + 1) * width];
            let dst_start = (y + row) * size + x;
            p.pixels[dst_start..dst_start + width].copy_from_slice(src);
        }
    }

    fn delete_page(&mut self, page: TextureHandle) {
        self.pages.remove(&page.0);
    }
}
