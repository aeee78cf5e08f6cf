use ffmpeg_next::Packet;

/**
    Destination for encoded packets.

    Packets arrive with their stream index set and timestamps already
    expressed in that stream's timebase.
*/
pub trait PacketWriter {
    fn write_packet(&mut self, packet: &mut Packet) -> Result<(), ffmpeg_next::Error>;
}
