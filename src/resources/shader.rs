//! Shader stage compilation and vertex input reflection
//!
//! Each stage arrives as its own WGSL blob. Blobs are parsed and validated
//! with naga before any GPU module is created, and the `@location` inputs of
//! the vertex entry point are reflected so the buffer layout can be checked
//! against what the shader actually consumes.

use thiserror::Error;

use crate::backend::types::{
    ShaderModuleDescriptor, ShaderStage, VertexBufferLayout, VertexFormat,
};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ShaderError {
    #[error("{label}: WGSL parse error: {message}")]
    Parse { label: String, message: String },
    #[error("{label}: validation error: {message}")]
    Validation { label: String, message: String },
    #[error("{label}: entry point '{entry_point}' not found for stage {stage:?}")]
    MissingEntryPoint {
        label: String,
        entry_point: &'static str,
        stage: ShaderStage,
    },
    #[error("{label}: input layout mismatch: {message}")]
    LayoutMismatch { label: String, message: String },
}

/// One reflected vertex input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageInput {
    pub location: u32,
    pub format: VertexFormat,
}

/// A parsed and validated shader stage
#[derive(Debug, Clone)]
pub struct CompiledStage {
    pub label: String,
    pub stage: ShaderStage,
    pub source: String,
    /// Vertex inputs sorted by location. Empty for fragment stages.
    pub inputs: Vec<StageInput>,
}

impl CompiledStage {
    pub fn descriptor(&self) -> ShaderModuleDescriptor {
        ShaderModuleDescriptor {
            label: Some(self.label.clone()),
            stage: self.stage,
            source: self.source.clone(),
        }
    }

    /// Derive the input layout this stage reads from `buffer`.
    ///
    /// Every reflected input must be provided by the buffer at the same
    /// location with the same format. The result keeps the buffer's stride
    /// and offsets and drops attributes the stage does not read.
    pub fn input_layout(
        &self,
        buffer: &VertexBufferLayout,
    ) -> Result<VertexBufferLayout, ShaderError> {
        let mut attributes = Vec::with_capacity(self.inputs.len());
        for input in &self.inputs {
            let provided = buffer
                .attributes
                .iter()
                .find(|a| a.location == input.location)
                .ok_or_else(|| {
                    self.mismatch(format!("location {} is not provided", input.location))
                })?;
            if provided.format != input.format {
                return Err(self.mismatch(format!(
                    "location {} expects {:?} but the buffer holds {:?}",
                    input.location, input.format, provided.format
                )));
            }
            attributes.push(provided.clone());
        }
        Ok(VertexBufferLayout {
            array_stride: buffer.array_stride,
            step_mode: buffer.step_mode,
            attributes,
        })
    }

    fn mismatch(&self, message: String) -> ShaderError {
        ShaderError::LayoutMismatch {
            label: self.label.clone(),
            message,
        }
    }
}

/// Parse and validate one stage blob.
pub fn compile_stage(
    label: &str,
    stage: ShaderStage,
    bytes: &[u8],
) -> Result<CompiledStage, ShaderError> {
    let source = std::str::from_utf8(bytes).map_err(|e| ShaderError::Parse {
        label: label.to_string(),
        message: format!("invalid UTF-8: {e}"),
    })?;

    let module = naga::front::wgsl::parse_str(source).map_err(|e| ShaderError::Parse {
        label: label.to_string(),
        message: format!("{e}"),
    })?;

    let mut validator = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    );
    validator.validate(&module).map_err(|e| ShaderError::Validation {
        label: label.to_string(),
        message: format!("{e}"),
    })?;

    let naga_stage = match stage {
        ShaderStage::Vertex => naga::ShaderStage::Vertex,
        ShaderStage::Fragment => naga::ShaderStage::Fragment,
    };
    let entry_point = module
        .entry_points
        .iter()
        .find(|ep| ep.name == stage.entry_point() && ep.stage == naga_stage)
        .ok_or_else(|| ShaderError::MissingEntryPoint {
            label: label.to_string(),
            entry_point: stage.entry_point(),
            stage,
        })?;

    let inputs = match stage {
        ShaderStage::Vertex => reflect_inputs(label, &module, &entry_point.function)?,
        ShaderStage::Fragment => Vec::new(),
    };

    Ok(CompiledStage {
        label: label.to_string(),
        stage,
        source: source.to_string(),
        inputs,
    })
}

fn reflect_inputs(
    label: &str,
    module: &naga::Module,
    function: &naga::Function,
) -> Result<Vec<StageInput>, ShaderError> {
    let mut inputs = Vec::new();
    for argument in &function.arguments {
        match &argument.binding {
            Some(binding) => collect_input(label, module, binding, argument.ty, &mut inputs)?,
            // Struct arguments carry the bindings on their members
            None => {
                if let naga::TypeInner::Struct { members, .. } = &module.types[argument.ty].inner {
                    for member in members {
                        if let Some(binding) = &member.binding {
                            collect_input(label, module, binding, member.ty, &mut inputs)?;
                        }
                    }
                }
            }
        }
    }
    inputs.sort_by_key(|input| input.location);
    Ok(inputs)
}

fn collect_input(
    label: &str,
    module: &naga::Module,
    binding: &naga::Binding,
    ty: naga::Handle<naga::Type>,
    inputs: &mut Vec<StageInput>,
) -> Result<(), ShaderError> {
    let naga::Binding::Location { location, .. } = binding else {
        // Built-ins such as vertex_index are not buffer inputs
        return Ok(());
    };
    let unsupported = || ShaderError::LayoutMismatch {
        label: label.to_string(),
        message: format!("location {} has a non-f32 input type", location),
    };
    let (components, scalar) = match &module.types[ty].inner {
        naga::TypeInner::Scalar(scalar) => (1, *scalar),
        naga::TypeInner::Vector { size, scalar } => (*size as u32, *scalar),
        _ => return Err(unsupported()),
    };
    if scalar.kind != naga::ScalarKind::Float || scalar.width != 4 {
        return Err(unsupported());
    }
    let format = VertexFormat::float_vector(components).ok_or_else(unsupported)?;
    inputs.push(StageInput {
        location: *location,
        format,
    });
    Ok(())
}
